use crate::core::objects::{Family, ObjectKind, Verb};
use thiserror::Error;

/// Core error types for the fake backend
#[derive(Debug, Error)]
pub enum Error {
    /// The store holds no table, so nothing but `add table` can succeed
    #[error("no such table \"{family} {name}\"")]
    TableNotFound { family: Family, name: String },

    /// A named chain, set or map does not exist
    #[error("no such {kind} {name:?}")]
    ObjectNotFound { kind: ObjectKind, name: String },

    /// No rule in the chain carries the requested handle
    #[error("no rule with handle {handle} in chain {chain:?}")]
    RuleNotFound { chain: String, handle: u64 },

    /// No element in the set or map matches the (substituted) key
    #[error("no such element {key:?} in {kind} {name:?}")]
    ElementNotFound {
        kind: ObjectKind,
        name: String,
        key: String,
    },

    /// A list accessor was asked for a kind of object the table cannot hold
    #[error("no such object type {0:?}")]
    UnknownObjectType(String),

    /// The verb is not defined for this object kind
    #[error("unsupported operation \"{verb}\" on {kind}")]
    UnsupportedOperation { verb: Verb, kind: ObjectKind },

    /// The verb itself is not recognized
    #[error("unsupported operation {0:?}")]
    UnsupportedVerb(String),

    /// The object kind is not recognized at all
    #[error("unsupported object type {0:?}")]
    UnsupportedObjectKind(String),

    /// An object failed validation while the transaction was being built
    #[error("invalid {kind}: {message}")]
    Validation { kind: ObjectKind, message: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` for errors caused by a missing table, chain, set, map,
    /// rule or element, or a listing of an object type the table cannot hold.
    /// Callers branch on this to treat "already gone" as success.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TableNotFound { .. }
                | Error::ObjectNotFound { .. }
                | Error::RuleNotFound { .. }
                | Error::ElementNotFound { .. }
                | Error::UnknownObjectType(_)
        )
    }

    /// Returns `true` for bad verb/kind combinations and unknown object kinds.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedOperation { .. }
                | Error::UnsupportedVerb(_)
                | Error::UnsupportedObjectKind(_)
        )
    }

    pub(crate) fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        Error::ObjectNotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn unsupported(verb: Verb, kind: ObjectKind) -> Self {
        Error::UnsupportedOperation { verb, kind }
    }

    pub(crate) fn invalid(kind: ObjectKind, message: impl Into<String>) -> Self {
        Error::Validation {
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
