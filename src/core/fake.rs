//! In-memory nftables state
//!
//! [`Fake`] owns at most one table, the handle counter and the active
//! defines. Each stored object is wrapped in a record that pairs the object
//! as it was committed with the children it owns:
//!
//! - [`FakeTable`] → chains, sets and maps, keyed (and therefore sorted) by name
//! - [`FakeChain`] → rules in evaluation order
//! - [`FakeSet`] / [`FakeMap`] → elements in insertion order
//!
//! Mutation only happens through [`Fake::run`]; everything here is read-side.
//!
//! # Concurrency
//!
//! A `Fake` is a plain value with no interior locking. Give each test its
//! own instance, or wrap a shared one in a mutex.

use crate::config::FakeConfig;
use crate::core::defines::{Define, Defines};
use crate::core::error::{Error, Result};
use crate::core::objects::{Chain, Element, Family, Map, ObjectKind, Rule, Set, Table, join};
use std::collections::BTreeMap;
use std::str::FromStr;

/// The table together with everything it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTable {
    pub table: Table,
    pub chains: BTreeMap<String, FakeChain>,
    pub sets: BTreeMap<String, FakeSet>,
    pub maps: BTreeMap<String, FakeMap>,
}

impl FakeTable {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            chains: BTreeMap::new(),
            sets: BTreeMap::new(),
            maps: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeChain {
    pub chain: Chain,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeSet {
    pub set: Set,
    pub elements: Vec<Element>,
}

impl FakeSet {
    /// Looks up an element by its (already substituted) key parts
    pub fn find_element<S: AsRef<str>>(&self, key: &[S]) -> Option<&Element> {
        find_element(&self.elements, &join(key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMap {
    pub map: Map,
    pub elements: Vec<Element>,
}

impl FakeMap {
    /// Looks up an element by its (already substituted) key parts
    pub fn find_element<S: AsRef<str>>(&self, key: &[S]) -> Option<&Element> {
        find_element(&self.elements, &join(key))
    }
}

pub(crate) fn find_element<'a>(elements: &'a [Element], key: &str) -> Option<&'a Element> {
    elements.iter().find(|e| e.key == key)
}

/// A simulated nftables backend for a single table
#[derive(Debug, Clone)]
pub struct Fake {
    pub(crate) family: Family,
    pub(crate) name: String,
    pub(crate) defines: Defines,
    pub(crate) next_handle: u64,
    pub(crate) table: Option<FakeTable>,
}

impl Fake {
    /// Creates an empty fake for `family`/`table`, seeded with the family's
    /// default defines. The table itself does not exist until a transaction
    /// adds it.
    pub fn new(family: Family, table: impl Into<String>) -> Self {
        Self {
            family,
            name: table.into(),
            defines: Defines::for_family(family),
            next_handle: 0,
            table: None,
        }
    }

    /// Creates a fake from configuration. Extra defines are registered after
    /// the family defaults, so the defaults win on overlapping names.
    pub fn from_config(config: &FakeConfig) -> Self {
        let mut fake = Self::new(config.family, config.table.clone());
        for define in &config.defines {
            fake.defines.register(define.clone());
        }
        fake
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn table_name(&self) -> &str {
        &self.name
    }

    /// The table and its contents, if it has been added
    pub fn table(&self) -> Option<&FakeTable> {
        self.table.as_ref()
    }

    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    /// Registers an additional define. Only strings committed after this
    /// call are affected.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defines.register(Define::new(name, value));
    }

    /// Always succeeds: the fake needs no external tool
    pub fn present(&self) -> Result<()> {
        Ok(())
    }

    fn require_table(&self) -> Result<&FakeTable> {
        self.table.as_ref().ok_or_else(|| Error::TableNotFound {
            family: self.family,
            name: self.name.clone(),
        })
    }

    /// Lists the names of all chains, sets or maps, in ascending order.
    ///
    /// `object_type` accepts singular or plural spellings (`chain`, `chains`, ...).
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the table does not exist or the type is
    /// not a chain, set or map.
    pub fn list(&self, object_type: &str) -> Result<Vec<String>> {
        let table = self.require_table()?;
        let names = match ObjectKind::from_str(object_type) {
            Ok(ObjectKind::Chain) => table.chains.keys().cloned().collect(),
            Ok(ObjectKind::Set) => table.sets.keys().cloned().collect(),
            Ok(ObjectKind::Map) => table.maps.keys().cloned().collect(),
            _ => return Err(Error::UnknownObjectType(object_type.to_string())),
        };
        Ok(names)
    }

    /// Returns a chain's rules in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the table or the chain does not exist.
    pub fn list_rules(&self, chain: &str) -> Result<&[Rule]> {
        let table = self.require_table()?;
        table
            .chains
            .get(chain)
            .map(|c| c.rules.as_slice())
            .ok_or_else(|| Error::not_found(ObjectKind::Chain, chain))
    }

    /// Returns a set's or map's elements in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the table or the named set/map does not
    /// exist, or if `object_type` is neither `set` nor `map`.
    pub fn list_elements(&self, object_type: &str, name: &str) -> Result<&[Element]> {
        let kind = ObjectKind::from_str(object_type)
            .map_err(|_| Error::UnknownObjectType(object_type.to_string()))?;
        let table = self.require_table()?;
        let elements = match kind {
            ObjectKind::Set => table.sets.get(name).map(|s| s.elements.as_slice()),
            ObjectKind::Map => table.maps.get(name).map(|m| m.elements.as_slice()),
            _ => return Err(Error::UnknownObjectType(object_type.to_string())),
        };
        elements.ok_or_else(|| Error::not_found(kind, name))
    }

    /// Finds a single element of a set or map by key parts.
    ///
    /// Returns `Ok(None)` when the parent exists but holds no such key.
    ///
    /// # Errors
    ///
    /// Same as [`Fake::list_elements`].
    pub fn find_element<S: AsRef<str>>(
        &self,
        object_type: &str,
        name: &str,
        key: &[S],
    ) -> Result<Option<&Element>> {
        let elements = self.list_elements(object_type, name)?;
        Ok(find_element(elements, &join(key)))
    }
}
