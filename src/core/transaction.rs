//! Ordered batches of verb + object operations
//!
//! A [`Transaction`] is built by the caller and handed to a backend's `run`.
//! Objects are validated as they are added; the first invalid object is
//! remembered and makes every later builder call a no-op, so the whole batch
//! fails up front instead of half-applying.

use crate::core::error::{Error, Result};
use crate::core::objects::{Chain, Element, Map, Object, ObjectKind, Rule, Set, Table, Verb};
use crate::validators::{validate_identifier, validate_optional_comment};
use serde_json::Value;
use std::str::FromStr;

/// A single batch entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub verb: Verb,
    pub object: Object,
}

#[derive(Debug, Default)]
pub struct Transaction {
    operations: Vec<Operation>,
    err: Option<Error>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, or does nothing if it already exists
    pub fn add(&mut self, object: impl Into<Object>) -> &mut Self {
        self.push(Verb::Add, object.into())
    }

    /// Creates an object, failing if it already exists.
    ///
    /// [`crate::Fake`] rejects this verb for every object kind.
    pub fn create(&mut self, object: impl Into<Object>) -> &mut Self {
        self.push(Verb::Create, object.into())
    }

    /// Removes the contents of a table, chain, set or map
    pub fn flush(&mut self, object: impl Into<Object>) -> &mut Self {
        self.push(Verb::Flush, object.into())
    }

    pub fn delete(&mut self, object: impl Into<Object>) -> &mut Self {
        self.push(Verb::Delete, object.into())
    }

    fn push(&mut self, verb: Verb, object: Object) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        match validate(verb, &object) {
            Ok(()) => self.operations.push(Operation { verb, object }),
            Err(e) => self.err = Some(e),
        }
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The error recorded while building, if any
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Splits the batch into its operations and any construction-time error
    pub(crate) fn into_parts(self) -> (Vec<Operation>, Option<Error>) {
        (self.operations, self.err)
    }

    /// Decodes an nftables-JSON-style batch:
    ///
    /// ```json
    /// { "nftables": [ { "add": { "chain": { "name": "input" } } } ] }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - The input is not valid JSON or lacks the `nftables` array
    /// - An entry uses an unknown verb (`UnsupportedOperation`-class error)
    /// - An entry addresses an unknown object kind (`UnsupportedObjectKind`)
    /// - An object body does not match its kind's schema
    ///
    /// Validation failures are not returned here; they are recorded on the
    /// transaction exactly as with the builder methods.
    pub fn from_json(json: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(json)?;
        let entries = root
            .get("nftables")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing nftables array"))?;

        let mut tx = Transaction::new();
        for entry in entries {
            let (verb_key, body) = single_entry(entry)?;
            let verb = Verb::from_str(verb_key)
                .map_err(|_| Error::UnsupportedVerb(verb_key.to_string()))?;
            let (kind_key, _) = single_entry(body)?;
            let kind = ObjectKind::from_str(kind_key)
                .map_err(|_| Error::UnsupportedObjectKind(kind_key.to_string()))?;
            if kind_key != kind.to_string() {
                // plural spellings are for list accessors only
                return Err(Error::UnsupportedObjectKind(kind_key.to_string()));
            }
            let object: Object = serde_json::from_value(body.clone())?;
            tx.push(verb, object);
        }
        Ok(tx)
    }
}

fn malformed(message: &str) -> Error {
    Error::Serialization(<serde_json::Error as serde::de::Error>::custom(message))
}

/// Unwraps a `{ "key": value }` object with exactly one member
fn single_entry(value: &Value) -> Result<(&str, &Value)> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("batch entry must be an object"))?;
    let mut iter = obj.iter();
    match (iter.next(), iter.next()) {
        (Some((key, inner)), None) => Ok((key.as_str(), inner)),
        _ => Err(malformed("batch entry must have exactly one key")),
    }
}

/// Construction-time checks. Never rejects a verb by itself: unsupported
/// verb/kind pairs are the engine's call.
fn validate(verb: Verb, object: &Object) -> Result<()> {
    match object {
        Object::Table(table) => validate_table(verb, table),
        Object::Chain(chain) => validate_chain(verb, chain),
        Object::Rule(rule) => validate_rule(verb, rule),
        Object::Set(set) => validate_set(verb, set),
        Object::Map(map) => validate_map(verb, map),
        Object::Element(element) => validate_element(element),
    }
}

fn forbids_handle(verb: Verb) -> bool {
    matches!(verb, Verb::Add | Verb::Create | Verb::Flush)
}

fn validate_table(verb: Verb, table: &Table) -> Result<()> {
    let kind = ObjectKind::Table;
    if forbids_handle(verb) && table.handle.is_some() {
        return Err(Error::invalid(kind, format!("cannot specify handle in {verb}")));
    }
    validate_optional_comment(table.comment.as_deref()).map_err(|e| Error::invalid(kind, e))
}

fn validate_chain(verb: Verb, chain: &Chain) -> Result<()> {
    let kind = ObjectKind::Chain;
    validate_identifier(&chain.name).map_err(|e| Error::invalid(kind, e))?;
    if forbids_handle(verb) && chain.handle.is_some() {
        return Err(Error::invalid(kind, format!("cannot specify handle in {verb}")));
    }
    match (&chain.chain_type, &chain.hook, &chain.priority) {
        (Some(_), Some(_), Some(_)) | (None, None, _) => {}
        (Some(_), _, _) => {
            return Err(Error::invalid(
                kind,
                format!("base chain {:?} requires hook and priority", chain.name),
            ));
        }
        (None, Some(_), _) => {
            return Err(Error::invalid(
                kind,
                format!("chain {:?} has a hook but no type", chain.name),
            ));
        }
    }
    validate_optional_comment(chain.comment.as_deref()).map_err(|e| Error::invalid(kind, e))
}

fn validate_rule(verb: Verb, rule: &Rule) -> Result<()> {
    let kind = ObjectKind::Rule;
    validate_identifier(&rule.chain).map_err(|e| Error::invalid(kind, e))?;
    if rule.index.is_some() && rule.handle.is_some() {
        return Err(Error::invalid(kind, "cannot specify both index and handle"));
    }
    match verb {
        Verb::Add | Verb::Create if rule.text.trim().is_empty() => {
            return Err(Error::invalid(kind, format!("{verb} requires rule text")));
        }
        Verb::Delete if rule.handle.is_none() => {
            return Err(Error::invalid(kind, "delete requires a handle"));
        }
        _ => {}
    }
    validate_optional_comment(rule.comment.as_deref()).map_err(|e| Error::invalid(kind, e))
}

fn validate_typed_collection(
    kind: ObjectKind,
    verb: Verb,
    name: &str,
    type_desc: Option<&str>,
    type_of: Option<&str>,
    handle: Option<u64>,
    comment: Option<&str>,
) -> Result<()> {
    validate_identifier(name).map_err(|e| Error::invalid(kind, e))?;
    if forbids_handle(verb) && handle.is_some() {
        return Err(Error::invalid(kind, format!("cannot specify handle in {verb}")));
    }
    if matches!(verb, Verb::Add | Verb::Create) && type_desc.is_some() == type_of.is_some() {
        return Err(Error::invalid(
            kind,
            format!("{kind} {name:?} must specify exactly one of type or typeof"),
        ));
    }
    validate_optional_comment(comment).map_err(|e| Error::invalid(kind, e))
}

fn validate_set(verb: Verb, set: &Set) -> Result<()> {
    validate_typed_collection(
        ObjectKind::Set,
        verb,
        &set.name,
        set.set_type.as_deref(),
        set.type_of.as_deref(),
        set.handle,
        set.comment.as_deref(),
    )
}

fn validate_map(verb: Verb, map: &Map) -> Result<()> {
    validate_typed_collection(
        ObjectKind::Map,
        verb,
        &map.name,
        map.map_type.as_deref(),
        map.type_of.as_deref(),
        map.handle,
        map.comment.as_deref(),
    )
}

fn validate_element(element: &Element) -> Result<()> {
    let kind = ObjectKind::Element;
    validate_identifier(&element.name).map_err(|e| Error::invalid(kind, e))?;
    if element.key.trim().is_empty() {
        return Err(Error::invalid(kind, "key cannot be empty"));
    }
    validate_optional_comment(element.comment.as_deref()).map_err(|e| Error::invalid(kind, e))
}
