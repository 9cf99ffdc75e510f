//! nftables object model
//!
//! Plain data types for everything a transaction can carry: the table, its
//! chains, rules, sets, maps and set/map elements. None of these types know
//! how to apply themselves; that lives in [`crate::core::engine`].
//!
//! # Handles
//!
//! Every object has an optional `handle`. It is `None` until the backend
//! assigns one and is never represented by a sentinel such as `0`.
//!
//! # Example
//!
//! ```
//! use nftfake::core::objects::{Chain, Element, Rule, Set};
//!
//! let chain = Chain::new("services");
//! let rule = Rule::new("services", "ip daddr $IP drop").with_comment("block");
//! let set = Set::new("allowed", "ipv4_addr");
//! let element = Element::set("allowed", "10.0.0.1");
//! assert!(!element.is_map_element());
//! # let _ = (chain, rule, set);
//! ```

use serde::{Deserialize, Serialize};

/// Address family a table applies to
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// IPv4 only
    #[strum(serialize = "ip")]
    Ip,
    /// IPv6 only
    #[strum(serialize = "ip6")]
    Ip6,
    /// Dual-stack IPv4 + IPv6
    #[default]
    #[strum(serialize = "inet")]
    Inet,
    #[strum(serialize = "arp")]
    Arp,
    #[strum(serialize = "bridge")]
    Bridge,
    #[strum(serialize = "netdev")]
    Netdev,
}

/// Requested operation kind of a transaction entry
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "create")]
    Create,
    #[strum(serialize = "flush")]
    Flush,
    #[strum(serialize = "delete")]
    Delete,
}

impl Verb {
    /// Verbs that allocate a handle before dispatch
    pub const fn allocates_handle(self) -> bool {
        matches!(self, Verb::Add | Verb::Create)
    }
}

/// Object kinds known to the backend.
///
/// Parsing accepts the plural spellings (`chains`, `sets`, `maps`) used by
/// the list accessors; display always uses the singular form.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum ObjectKind {
    #[strum(serialize = "table")]
    Table,
    #[strum(to_string = "chain", serialize = "chains")]
    Chain,
    #[strum(serialize = "rule")]
    Rule,
    #[strum(to_string = "set", serialize = "sets")]
    Set,
    #[strum(to_string = "map", serialize = "maps")]
    Map,
    #[strum(serialize = "element")]
    Element,
}

/// Set and map flags
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum SetFlag {
    #[strum(serialize = "constant")]
    Constant,
    #[strum(serialize = "dynamic")]
    Dynamic,
    #[strum(serialize = "interval")]
    Interval,
    #[strum(serialize = "timeout")]
    Timeout,
}

/// Set and map lookup policy
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum SetPolicy {
    #[strum(serialize = "performance")]
    Performance,
    #[strum(serialize = "memory")]
    Memory,
}

/// The root container. Its family and name are owned by the backend
/// instance, so only the mutable attributes live here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<u64>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A named, ordered rule container.
///
/// Setting `chain_type` makes it a base chain, which additionally needs
/// `hook` and `priority`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chain {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub chain_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<u64>,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Turns this into a base chain attached to `hook`
    pub fn with_hook(
        mut self,
        chain_type: impl Into<String>,
        hook: impl Into<String>,
        priority: impl Into<String>,
    ) -> Self {
        self.chain_type = Some(chain_type.into());
        self.hook = Some(hook.into());
        self.priority = Some(priority.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_handle(mut self, handle: u64) -> Self {
        self.handle = Some(handle);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub chain: String,
    /// Rule body, e.g. `ip daddr 10.0.0.1 drop`
    #[serde(rename = "rule", default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Position hint; never used for identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<u64>,
}

impl Rule {
    pub fn new(chain: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// A rule reference suitable for `delete`, identified only by handle
    pub fn with_handle(chain: impl Into<String>, handle: u64) -> Self {
        Self {
            chain: chain.into(),
            handle: Some(handle),
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Set {
    pub name: String,
    /// Element type, e.g. `ipv4_addr . inet_service`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub set_type: Option<String>,
    /// Element type expressed as a match expression, e.g. `ip daddr`
    #[serde(rename = "typeof", default, skip_serializing_if = "Option::is_none")]
    pub type_of: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<SetFlag>,
    /// Element timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Garbage collection interval in seconds
    #[serde(
        rename = "gc-interval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gc_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<SetPolicy>,
    #[serde(rename = "auto-merge", default, skip_serializing_if = "Option::is_none")]
    pub auto_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<u64>,
}

impl Set {
    pub fn new(name: impl Into<String>, set_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            set_type: Some(set_type.into()),
            ..Self::default()
        }
    }

    /// A bare reference by name, for `flush` and `delete`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = SetFlag>) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Like [`Set`], but elements map a key to a value. The type descriptor
/// covers both sides, e.g. `ipv4_addr : verdict`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Map {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub map_type: Option<String>,
    #[serde(rename = "typeof", default, skip_serializing_if = "Option::is_none")]
    pub type_of: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<SetFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(
        rename = "gc-interval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gc_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<SetPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<u64>,
}

impl Map {
    pub fn new(name: impl Into<String>, map_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map_type: Some(map_type.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = SetFlag>) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A member of a set (key only) or of a map (key and value).
///
/// `name` is the parent set or map. There is no separate tag: a non-empty
/// `value` makes this a map element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Element {
    pub fn set(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn map(
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            value: Some(value.into()),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_map_element(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Kind of the parent collection this element addresses
    pub fn parent_kind(&self) -> ObjectKind {
        if self.is_map_element() {
            ObjectKind::Map
        } else {
            ObjectKind::Set
        }
    }
}

/// Joins the parts of a concatenated key (`10.0.0.1 . tcp . 80`)
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" . ")
}

/// Any object a transaction entry can address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Object {
    Table(Table),
    Chain(Chain),
    Rule(Rule),
    Set(Set),
    Map(Map),
    Element(Element),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Table(_) => ObjectKind::Table,
            Object::Chain(_) => ObjectKind::Chain,
            Object::Rule(_) => ObjectKind::Rule,
            Object::Set(_) => ObjectKind::Set,
            Object::Map(_) => ObjectKind::Map,
            Object::Element(_) => ObjectKind::Element,
        }
    }
}

impl From<Table> for Object {
    fn from(table: Table) -> Self {
        Object::Table(table)
    }
}

impl From<Chain> for Object {
    fn from(chain: Chain) -> Self {
        Object::Chain(chain)
    }
}

impl From<Rule> for Object {
    fn from(rule: Rule) -> Self {
        Object::Rule(rule)
    }
}

impl From<Set> for Object {
    fn from(set: Set) -> Self {
        Object::Set(set)
    }
}

impl From<Map> for Object {
    fn from(map: Map) -> Self {
        Object::Map(map)
    }
}

impl From<Element> for Object {
    fn from(element: Element) -> Self {
        Object::Element(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_family_display_and_parse() {
        assert_eq!(Family::Ip6.to_string(), "ip6");
        assert_eq!(Family::from_str("netdev").unwrap(), Family::Netdev);
        assert_eq!(Family::default(), Family::Inet);
        assert!(Family::from_str("ipx").is_err());
    }

    #[test]
    fn test_object_kind_accepts_plurals() {
        assert_eq!(ObjectKind::from_str("chains").unwrap(), ObjectKind::Chain);
        assert_eq!(ObjectKind::from_str("chain").unwrap(), ObjectKind::Chain);
        assert_eq!(ObjectKind::from_str("maps").unwrap(), ObjectKind::Map);
        assert_eq!(ObjectKind::Set.to_string(), "set");
        assert!(ObjectKind::from_str("rules").is_err());
    }

    #[test]
    fn test_verb_allocates_handle() {
        assert!(Verb::Add.allocates_handle());
        assert!(Verb::Create.allocates_handle());
        assert!(!Verb::Flush.allocates_handle());
        assert!(!Verb::Delete.allocates_handle());
    }

    #[test]
    fn test_element_parent_kind_is_structural() {
        assert_eq!(Element::set("s", "k").parent_kind(), ObjectKind::Set);
        assert_eq!(Element::map("m", "k", "v").parent_kind(), ObjectKind::Map);

        // An empty value does not make a map element
        let mut element = Element::set("s", "k");
        element.value = Some(String::new());
        assert!(!element.is_map_element());
    }

    #[test]
    fn test_join_concatenated_key() {
        assert_eq!(join(&["10.0.0.1", "tcp", "80"]), "10.0.0.1 . tcp . 80");
        assert_eq!(join(&["solo"]), "solo");
    }

    #[test]
    fn test_object_json_shape() {
        let obj = Object::from(Rule::new("input", "tcp dport 22 accept"));
        let json = serde_json::to_value(&obj).unwrap();
        assert_eq!(json["rule"]["chain"], "input");
        assert_eq!(json["rule"]["rule"], "tcp dport 22 accept");
        assert!(json["rule"].get("handle").is_none());

        let set: Object = serde_json::from_value(serde_json::json!({
            "set": { "name": "s", "type": "ipv4_addr", "flags": ["interval"], "auto-merge": true }
        }))
        .unwrap();
        match set {
            Object::Set(s) => {
                assert_eq!(s.set_type.as_deref(), Some("ipv4_addr"));
                assert_eq!(s.flags, vec![SetFlag::Interval]);
                assert_eq!(s.auto_merge, Some(true));
            }
            other => panic!("expected set, got {other:?}"),
        }
    }
}
