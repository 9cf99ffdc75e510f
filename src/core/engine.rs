//! Transaction application
//!
//! [`Fake::run`] walks a [`Transaction`] in order and hands each operation to
//! the handler for its object kind. Each handler owns the verb table for that
//! kind:
//!
//! | kind      | add                  | flush          | delete            |
//! |-----------|----------------------|----------------|-------------------|
//! | table     | create if absent     | clear + re-add | clear store       |
//! | chain     | create if absent     | drop rules     | remove by name    |
//! | set / map | create if absent     | drop elements  | remove by name    |
//! | rule      | append               | -              | remove by handle  |
//! | element   | upsert by key        | -              | remove by key     |
//!
//! `create` has no behavior for any kind and fails as unsupported, although it
//! still consumes a handle. Rules and elements look up their parent first, so
//! a missing chain, set or map wins over an unsupported verb.
//!
//! # Partial application
//!
//! The first failing operation aborts the run. Operations before it stay
//! applied; there is no rollback.

use crate::core::error::{Error, Result};
use crate::core::fake::{Fake, FakeChain, FakeMap, FakeSet, FakeTable};
use crate::core::objects::{Chain, Element, Map, Object, ObjectKind, Rule, Set, Table, Verb};
use crate::core::transaction::{Operation, Transaction};
use tracing::{debug, warn};

impl Fake {
    /// Applies `tx` to the store.
    ///
    /// # Errors
    ///
    /// Returns the transaction's construction-time error untouched, or the
    /// error of the first operation that fails. Earlier operations of the
    /// same batch remain applied.
    pub fn run(&mut self, tx: Transaction) -> Result<()> {
        let (operations, err) = tx.into_parts();
        if let Some(e) = err {
            warn!("Refusing to run invalid transaction: {e}");
            return Err(e);
        }

        let total = operations.len();
        for (i, op) in operations.into_iter().enumerate() {
            if let Err(e) = self.apply_operation(op) {
                debug!("Transaction aborted at operation {}/{}: {e}", i + 1, total);
                return Err(e);
            }
        }
        debug!("Applied {total} operation(s)");
        Ok(())
    }

    fn apply_operation(&mut self, op: Operation) -> Result<()> {
        let Operation { verb, object } = op;

        if self.table.is_none() && !(verb == Verb::Add && matches!(object, Object::Table(_))) {
            return Err(Error::TableNotFound {
                family: self.family,
                name: self.name.clone(),
            });
        }

        if verb.allocates_handle() {
            self.next_handle += 1;
        }

        debug!("{verb} {}", object.kind());
        match object {
            Object::Table(table) => self.apply_table(verb, table),
            Object::Chain(chain) => self.apply_chain(verb, chain),
            Object::Rule(rule) => self.apply_rule(verb, rule),
            Object::Set(set) => self.apply_set(verb, set),
            Object::Map(map) => self.apply_map(verb, map),
            Object::Element(element) => self.apply_element(verb, element),
        }
    }

    /// Table held by the store. Callers run after the table-presence check.
    fn table_mut(&mut self) -> Result<&mut FakeTable> {
        self.table.as_mut().ok_or_else(|| Error::TableNotFound {
            family: self.family,
            name: self.name.clone(),
        })
    }

    fn apply_table(&mut self, verb: Verb, table: Table) -> Result<()> {
        match verb {
            Verb::Add => {
                if self.table.is_none() {
                    self.insert_table(table);
                }
            }
            Verb::Flush => {
                self.table = None;
                self.insert_table(table);
            }
            Verb::Delete => {
                self.table = None;
            }
            Verb::Create => return Err(Error::unsupported(verb, ObjectKind::Table)),
        }
        Ok(())
    }

    fn insert_table(&mut self, mut table: Table) {
        table.handle = Some(self.next_handle);
        self.table = Some(FakeTable::new(table));
    }

    fn apply_chain(&mut self, verb: Verb, mut chain: Chain) -> Result<()> {
        let handle = self.next_handle;
        let table = self.table_mut()?;
        match verb {
            Verb::Add => {
                if !table.chains.contains_key(&chain.name) {
                    chain.handle = Some(handle);
                    table.chains.insert(
                        chain.name.clone(),
                        FakeChain {
                            chain,
                            rules: Vec::new(),
                        },
                    );
                }
            }
            Verb::Flush => {
                let existing = table
                    .chains
                    .get_mut(&chain.name)
                    .ok_or_else(|| Error::not_found(ObjectKind::Chain, &chain.name))?;
                existing.rules.clear();
            }
            Verb::Delete => {
                // TODO: match on chain.handle once delete-by-handle callers exist
                table
                    .chains
                    .remove(&chain.name)
                    .ok_or_else(|| Error::not_found(ObjectKind::Chain, &chain.name))?;
            }
            Verb::Create => return Err(Error::unsupported(verb, ObjectKind::Chain)),
        }
        Ok(())
    }

    fn apply_rule(&mut self, verb: Verb, mut rule: Rule) -> Result<()> {
        if verb == Verb::Add {
            rule.text = self.defines.substitute(&rule.text);
            rule.handle = Some(self.next_handle);
        }

        let table = self.table_mut()?;
        let chain = table
            .chains
            .get_mut(&rule.chain)
            .ok_or_else(|| Error::not_found(ObjectKind::Chain, &rule.chain))?;

        match verb {
            Verb::Add => {
                chain.rules.push(rule);
                return Ok(());
            }
            Verb::Delete => {}
            Verb::Create | Verb::Flush => return Err(Error::unsupported(verb, ObjectKind::Rule)),
        }

        let wanted = rule
            .handle
            .ok_or_else(|| Error::invalid(ObjectKind::Rule, "delete requires a handle"))?;
        let pos = chain
            .rules
            .iter()
            .position(|r| r.handle == Some(wanted))
            .ok_or(Error::RuleNotFound {
                chain: rule.chain,
                handle: wanted,
            })?;
        chain.rules.remove(pos);
        Ok(())
    }

    fn apply_set(&mut self, verb: Verb, mut set: Set) -> Result<()> {
        let handle = self.next_handle;
        if verb == Verb::Add {
            set.set_type = self.defines.substitute_opt(set.set_type.as_deref());
            set.type_of = self.defines.substitute_opt(set.type_of.as_deref());
        }

        let table = self.table_mut()?;
        match verb {
            Verb::Add => {
                if !table.sets.contains_key(&set.name) {
                    set.handle = Some(handle);
                    table.sets.insert(
                        set.name.clone(),
                        FakeSet {
                            set,
                            elements: Vec::new(),
                        },
                    );
                }
            }
            Verb::Flush => {
                table
                    .sets
                    .get_mut(&set.name)
                    .ok_or_else(|| Error::not_found(ObjectKind::Set, &set.name))?
                    .elements
                    .clear();
            }
            Verb::Delete => {
                table
                    .sets
                    .remove(&set.name)
                    .ok_or_else(|| Error::not_found(ObjectKind::Set, &set.name))?;
            }
            Verb::Create => return Err(Error::unsupported(verb, ObjectKind::Set)),
        }
        Ok(())
    }

    fn apply_map(&mut self, verb: Verb, mut map: Map) -> Result<()> {
        let handle = self.next_handle;
        if verb == Verb::Add {
            map.map_type = self.defines.substitute_opt(map.map_type.as_deref());
            map.type_of = self.defines.substitute_opt(map.type_of.as_deref());
        }

        let table = self.table_mut()?;
        match verb {
            Verb::Add => {
                if !table.maps.contains_key(&map.name) {
                    map.handle = Some(handle);
                    table.maps.insert(
                        map.name.clone(),
                        FakeMap {
                            map,
                            elements: Vec::new(),
                        },
                    );
                }
            }
            Verb::Flush => {
                table
                    .maps
                    .get_mut(&map.name)
                    .ok_or_else(|| Error::not_found(ObjectKind::Map, &map.name))?
                    .elements
                    .clear();
            }
            Verb::Delete => {
                table
                    .maps
                    .remove(&map.name)
                    .ok_or_else(|| Error::not_found(ObjectKind::Map, &map.name))?;
            }
            Verb::Create => return Err(Error::unsupported(verb, ObjectKind::Map)),
        }
        Ok(())
    }

    fn apply_element(&mut self, verb: Verb, mut element: Element) -> Result<()> {
        let kind = element.parent_kind();
        element.key = self.defines.substitute(&element.key);
        if verb == Verb::Add {
            element.value = self.defines.substitute_opt(element.value.as_deref());
        }

        let table = self.table_mut()?;
        let elements = match kind {
            ObjectKind::Map => table.maps.get_mut(&element.name).map(|m| &mut m.elements),
            _ => table.sets.get_mut(&element.name).map(|s| &mut s.elements),
        }
        .ok_or_else(|| Error::not_found(kind, &element.name))?;

        if !matches!(verb, Verb::Add | Verb::Delete) {
            return Err(Error::unsupported(verb, ObjectKind::Element));
        }

        let pos = elements.iter().position(|e| e.key == element.key);
        match (verb, pos) {
            (Verb::Add, Some(i)) => elements[i] = element,
            (Verb::Add, None) => elements.push(element),
            (_, Some(i)) => {
                elements.remove(i);
            }
            (_, None) => {
                return Err(Error::ElementNotFound {
                    kind,
                    name: element.name,
                    key: element.key,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::objects::Family;

    fn fake_with_table() -> Fake {
        let mut fake = Fake::new(Family::Inet, "t");
        let mut tx = Transaction::new();
        tx.add(Table::new());
        fake.run(tx).unwrap();
        fake
    }

    #[test]
    fn test_add_table_twice_keeps_first_handle() {
        let mut fake = Fake::new(Family::Inet, "t");
        let mut tx = Transaction::new();
        tx.add(Table::new()).add(Table::new().with_comment("second"));
        fake.run(tx).unwrap();

        let table = fake.table().unwrap();
        assert_eq!(table.table.handle, Some(1));
        assert_eq!(table.table.comment, None);
        assert_eq!(fake.next_handle, 2);
    }

    #[test]
    fn test_operation_before_table_is_not_found() {
        let mut fake = Fake::new(Family::Inet, "t");
        let mut tx = Transaction::new();
        tx.add(Chain::new("c"));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(err, Error::TableNotFound { .. }));
        // no handle consumed by the rejected add
        assert_eq!(fake.next_handle, 0);

        let mut tx = Transaction::new();
        tx.flush(Table::new());
        assert!(fake.run(tx).unwrap_err().is_not_found());
        assert!(fake.table().is_none());
    }

    #[test]
    fn test_flush_table_recreates_empty() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Chain::new("c"))
            .add(Rule::new("c", "accept"))
            .flush(Table::new().with_comment("fresh"));
        fake.run(tx).unwrap();

        let table = fake.table().unwrap();
        assert!(table.chains.is_empty());
        assert_eq!(table.table.comment.as_deref(), Some("fresh"));
        // flush does not tick the counter; the new table reuses its value
        assert_eq!(table.table.handle, Some(fake.next_handle));
    }

    #[test]
    fn test_delete_table_clears_store() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Chain::new("c")).delete(Table::new());
        fake.run(tx).unwrap();
        assert!(fake.table().is_none());
    }

    #[test]
    fn test_create_is_unsupported_but_consumes_handle() {
        let mut fake = fake_with_table();
        let before = fake.next_handle;

        let mut tx = Transaction::new();
        tx.create(Chain::new("c"));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedOperation {
                verb: Verb::Create,
                kind: ObjectKind::Chain
            }
        ));
        assert_eq!(fake.next_handle, before + 1);
        assert!(fake.table().unwrap().chains.is_empty());

        // parents exist, so only the verb can be at fault
        let mut tx = Transaction::new();
        tx.add(Chain::new("c")).add(Set::new("s", "ipv4_addr"));
        fake.run(tx).unwrap();

        for obj in [
            Object::from(Table::new()),
            Object::from(Rule::new("c", "accept")),
            Object::from(Set::new("s", "ipv4_addr")),
            Object::from(Map::new("m", "ipv4_addr : verdict")),
            Object::from(Element::set("s", "1.2.3.4")),
        ] {
            let kind = obj.kind();
            let mut tx = Transaction::new();
            tx.create(obj);
            let err = fake.run(tx).unwrap_err();
            assert!(err.is_unsupported(), "create {kind} should be unsupported");
        }
    }

    #[test]
    fn test_add_chain_is_idempotent() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Chain::new("c").with_comment("first"))
            .add(Chain::new("c").with_comment("second"));
        fake.run(tx).unwrap();

        let chain = &fake.table().unwrap().chains["c"].chain;
        assert_eq!(chain.comment.as_deref(), Some("first"));
        assert_eq!(chain.handle, Some(2));
        // the idempotent add still ticked the counter
        assert_eq!(fake.next_handle, 3);
    }

    #[test]
    fn test_flush_chain_keeps_chain() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Chain::new("c"))
            .add(Rule::new("c", "accept"))
            .flush(Chain::new("c"));
        fake.run(tx).unwrap();

        let chain = &fake.table().unwrap().chains["c"];
        assert!(chain.rules.is_empty());
        assert!(chain.chain.handle.is_some());
    }

    #[test]
    fn test_flush_or_delete_missing_chain() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.flush(Chain::new("nope"));
        assert!(fake.run(tx).unwrap_err().is_not_found());

        let mut tx = Transaction::new();
        tx.delete(Chain::new("nope"));
        assert!(fake.run(tx).unwrap_err().is_not_found());
    }

    fn fake_with_collections() -> Fake {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Set::new("s", "ipv4_addr"))
            .add(Element::set("s", "10.0.0.1"))
            .add(Element::set("s", "10.0.0.2"))
            .add(Map::new("m", "ipv4_addr : verdict"))
            .add(Element::map("m", "10.0.0.1", "accept"));
        fake.run(tx).unwrap();
        fake
    }

    #[test]
    fn test_flush_set_keeps_set() {
        let mut fake = fake_with_collections();
        let handle = fake.table().unwrap().sets["s"].set.handle;

        let mut tx = Transaction::new();
        tx.flush(Set::named("s"));
        fake.run(tx).unwrap();

        let set = &fake.table().unwrap().sets["s"];
        assert!(set.elements.is_empty());
        assert_eq!(set.set.handle, handle);
        assert_eq!(set.set.set_type.as_deref(), Some("ipv4_addr"));
        // the map is untouched
        assert_eq!(fake.list_elements("map", "m").unwrap().len(), 1);
    }

    #[test]
    fn test_flush_map_keeps_map() {
        let mut fake = fake_with_collections();
        let mut tx = Transaction::new();
        tx.flush(Map::named("m"));
        fake.run(tx).unwrap();

        assert_eq!(fake.list("maps").unwrap(), vec!["m"]);
        assert!(fake.list_elements("map", "m").unwrap().is_empty());
        assert_eq!(fake.list_elements("set", "s").unwrap().len(), 2);
    }

    #[test]
    fn test_delete_set_and_map() {
        let mut fake = fake_with_collections();
        let mut tx = Transaction::new();
        tx.delete(Set::named("s")).delete(Map::named("m"));
        fake.run(tx).unwrap();

        let table = fake.table().unwrap();
        assert!(table.sets.is_empty());
        assert!(table.maps.is_empty());
        assert!(fake.list_elements("set", "s").unwrap_err().is_not_found());
    }

    #[test]
    fn test_flush_or_delete_missing_set_or_map() {
        let mut fake = fake_with_collections();
        let cases = [
            (Verb::Flush, Object::from(Set::named("zz")), ObjectKind::Set),
            (Verb::Delete, Object::from(Set::named("zz")), ObjectKind::Set),
            (Verb::Flush, Object::from(Map::named("zz")), ObjectKind::Map),
            (Verb::Delete, Object::from(Map::named("zz")), ObjectKind::Map),
            // names are per kind: "m" is a map, not a set
            (Verb::Delete, Object::from(Set::named("m")), ObjectKind::Set),
        ];
        for (verb, obj, want) in cases {
            let mut tx = Transaction::new();
            match verb {
                Verb::Flush => tx.flush(obj),
                _ => tx.delete(obj),
            };
            let err = fake.run(tx).unwrap_err();
            assert!(
                matches!(err, Error::ObjectNotFound { kind, .. } if kind == want),
                "{verb} {want}: unexpected {err:?}"
            );
        }
        // failed operations left the existing collections alone
        assert_eq!(fake.list("sets").unwrap(), vec!["s"]);
        assert_eq!(fake.list("maps").unwrap(), vec!["m"]);
    }

    #[test]
    fn test_missing_parent_reported_before_bad_verb() {
        let mut fake = fake_with_table();

        let mut tx = Transaction::new();
        tx.flush(Rule::new("nope", "accept"));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectNotFound {
                kind: ObjectKind::Chain,
                ..
            }
        ));

        let mut tx = Transaction::new();
        tx.create(Element::map("nope", "10.0.0.1", "drop"));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectNotFound {
                kind: ObjectKind::Map,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_chain_ignores_handle() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Chain::new("c"));
        fake.run(tx).unwrap();

        let mut tx = Transaction::new();
        tx.delete(Chain::new("c").with_handle(999));
        fake.run(tx).unwrap();
        assert!(fake.table().unwrap().chains.is_empty());
    }

    #[test]
    fn test_rule_add_requires_chain() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Rule::new("missing", "accept"));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectNotFound {
                kind: ObjectKind::Chain,
                ..
            }
        ));
    }

    #[test]
    fn test_rule_delete_unknown_handle() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Chain::new("c")).add(Rule::new("c", "accept"));
        fake.run(tx).unwrap();

        let mut tx = Transaction::new();
        tx.delete(Rule::with_handle("c", 12345));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(err, Error::RuleNotFound { handle: 12345, .. }));
        assert_eq!(fake.list_rules("c").unwrap().len(), 1);
    }

    #[test]
    fn test_rule_flush_unsupported() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Chain::new("c")).flush(Rule::new("c", "accept"));
        assert!(fake.run(tx).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_set_add_substitutes_types() {
        let mut fake = fake_with_table();
        fake.define("ADDR", "ipv4_addr");
        let mut set = Set::named("s");
        set.type_of = Some("ip daddr . $PROTO".to_string());
        let mut tx = Transaction::new();
        tx.add(Set::new("plain", "$ADDR")).add(set);
        fake.run(tx).unwrap();

        let table = fake.table().unwrap();
        assert_eq!(table.sets["plain"].set.set_type.as_deref(), Some("ipv4_addr"));
        // unknown placeholders survive untouched
        assert_eq!(table.sets["s"].set.type_of.as_deref(), Some("ip daddr . $PROTO"));
    }

    #[test]
    fn test_element_upsert_in_place() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Map::new("m", "ipv4_addr : verdict"))
            .add(Element::map("m", "1.1.1.1", "accept"))
            .add(Element::map("m", "2.2.2.2", "accept"))
            .add(Element::map("m", "1.1.1.1", "drop"));
        fake.run(tx).unwrap();

        let elements = fake.list_elements("map", "m").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].key, "1.1.1.1");
        assert_eq!(elements[0].value.as_deref(), Some("drop"));
        assert_eq!(elements[1].key, "2.2.2.2");
    }

    #[test]
    fn test_element_parent_chosen_by_value() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Set::new("x", "ipv4_addr"))
            .add(Element::map("x", "1.1.1.1", "drop"));
        // "x" is a set, a valued element addresses maps
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectNotFound {
                kind: ObjectKind::Map,
                ..
            }
        ));
    }

    #[test]
    fn test_element_delete_substitutes_key() {
        let mut fake = fake_with_table();
        fake.define("VIP", "10.0.0.1");
        let mut tx = Transaction::new();
        tx.add(Set::new("s", "ipv4_addr"))
            .add(Element::set("s", "$VIP"))
            .delete(Element::set("s", "$VIP"));
        fake.run(tx).unwrap();
        assert!(fake.list_elements("set", "s").unwrap().is_empty());

        let mut tx = Transaction::new();
        tx.delete(Element::set("s", "$VIP"));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(err, Error::ElementNotFound { ref key, .. } if key == "10.0.0.1"));
    }

    #[test]
    fn test_element_flush_unsupported() {
        let mut fake = fake_with_table();
        let mut tx = Transaction::new();
        tx.add(Set::new("s", "ipv4_addr")).flush(Element::set("s", "1.2.3.4"));
        assert!(fake.run(tx).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_construction_error_short_circuits() {
        let mut fake = Fake::new(Family::Inet, "t");
        let mut tx = Transaction::new();
        tx.add(Table::new()).add(Chain::new("bad name"));
        let err = fake.run(tx).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        // the valid table add before the fault was not applied either
        assert!(fake.table().is_none());
        assert_eq!(fake.next_handle, 0);
    }
}
