//! nftfake - an in-memory nftables backend for tests
//!
//! Code that programs nftables through transactions can be pointed at a
//! [`Fake`] instead of the real `nft` tool. The fake applies the same
//! add/create/flush/delete semantics to an in-memory table, hands out
//! handles, expands `$NAME` defines and renders its contents as a stable,
//! sorted dump that tests can compare against.
//!
//! # Architecture
//!
//! - [`core`] - Object model, transactions, the store, the apply engine and the dump
//! - [`interface`] - The async [`Interface`] trait shared with real backends
//! - [`validators`] - Identifier and comment validation
//! - [`config`] - JSON configuration for constructing a fake
//!
//! # Example
//!
//! ```
//! use nftfake::{Chain, Family, Fake, Rule, Table, Transaction};
//!
//! let mut fake = Fake::new(Family::Ip, "filter");
//! let mut tx = Transaction::new();
//! tx.add(Table::new())
//!     .add(Chain::new("input"))
//!     .add(Rule::new("input", "$IP saddr 10.0.0.1 drop"));
//! fake.run(tx).unwrap();
//!
//! assert_eq!(fake.list_rules("input").unwrap()[0].text, "ip saddr 10.0.0.1 drop");
//! ```

#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod core;
pub mod interface;
pub mod validators;

// Re-export commonly used types
pub use config::FakeConfig;
pub use core::dump::diff_dumps;
pub use core::error::{Error, Result};
pub use core::fake::{Fake, FakeChain, FakeMap, FakeSet, FakeTable};
pub use core::objects::{
    Chain, Element, Family, Map, Object, ObjectKind, Rule, Set, SetFlag, SetPolicy, Table, Verb,
};
pub use core::transaction::{Operation, Transaction};
pub use interface::Interface;
