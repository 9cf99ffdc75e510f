//! Core fake backend functionality
//!
//! - [`objects`]: The nftables object model carried by transactions
//! - [`transaction`]: Ordered, validated batches of operations
//! - [`defines`]: `$NAME` placeholder substitution
//! - [`fake`]: The in-memory store and its read accessors
//! - [`engine`]: Applying transactions to the store
//! - [`dump`]: Deterministic text rendering, checksums and diffs
//! - [`error`]: Error types for every operation

pub mod defines;
pub mod dump;
pub mod engine;
pub mod error;
pub mod fake;
pub mod objects;
pub mod transaction;

#[cfg(test)]
pub mod test_helpers;
