//! Fake backend configuration
//!
//! ```json
//! {
//!   "family": "ip",
//!   "table": "kube-proxy",
//!   "defines": [{ "name": "CLUSTER_CIDR", "value": "10.0.0.0/8" }]
//! }
//! ```
//!
//! Only `table` is required. There is no file IO here; callers read the
//! JSON however they like and hand in the string.

use crate::core::defines::Define;
use crate::core::error::{Error, Result};
use crate::core::objects::{Family, ObjectKind};
use crate::validators::validate_identifier;
use serde::{Deserialize, Serialize};

/// Everything needed to construct a [`crate::core::fake::Fake`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FakeConfig {
    #[serde(default = "default_family")]
    pub family: Family,
    pub table: String,
    /// Registered after the family defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<Define>,
}

fn default_family() -> Family {
    Family::Inet
}

impl FakeConfig {
    pub fn new(family: Family, table: impl Into<String>) -> Self {
        Self {
            family,
            table: table.into(),
            defines: Vec::new(),
        }
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push(Define::new(name, value));
        self
    }

    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the JSON is malformed, `table` is missing, or the
    /// table name is not a valid identifier.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `Err` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns `Err` if the table name or a define name is empty or malformed.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.table).map_err(|e| Error::invalid(ObjectKind::Table, e))?;
        if let Some(define) = self.defines.iter().find(|d| d.name.is_empty()) {
            return Err(Error::invalid(
                ObjectKind::Table,
                format!("define with empty name (value {:?})", define.value),
            ));
        }
        Ok(())
    }
}
