//! Backend-neutral nftables interface
//!
//! Code that programs nftables is written against [`Interface`] and handed
//! either a real backend or a [`Fake`] in tests. The methods are async
//! because a real backend shells out to `nft`; cancelling an operation means
//! dropping its future. The fake finishes every call on first poll, so it
//! never observes cancellation.
//!
//! Because `Fake` also has inherent methods with the same names, callers
//! holding a concrete `Fake` reach the async versions through a generic
//! bound or `Interface::run(&mut fake, tx)`.

use crate::core::error::Result;
use crate::core::fake::Fake;
use crate::core::objects::{Element, Rule};
use crate::core::transaction::Transaction;

#[allow(async_fn_in_trait)]
pub trait Interface {
    /// Checks that the backend is usable
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend cannot be reached.
    fn present(&self) -> Result<()>;

    /// Names of all chains, sets or maps in the table, ascending
    ///
    /// # Errors
    ///
    /// Returns `Err` if the table does not exist or the type is unknown.
    async fn list(&self, object_type: &str) -> Result<Vec<String>>;

    /// Rules of `chain` in evaluation order
    ///
    /// # Errors
    ///
    /// Returns `Err` if the table or chain does not exist.
    async fn list_rules(&self, chain: &str) -> Result<Vec<Rule>>;

    /// Elements of the named set or map in insertion order
    ///
    /// # Errors
    ///
    /// Returns `Err` if the table or collection does not exist.
    async fn list_elements(&self, object_type: &str, name: &str) -> Result<Vec<Element>>;

    /// Registers a `$name` placeholder for later transactions
    fn define(&mut self, name: &str, value: &str);

    /// Applies a transaction
    ///
    /// # Errors
    ///
    /// Returns the first failing operation's error.
    async fn run(&mut self, tx: Transaction) -> Result<()>;
}

impl Interface for Fake {
    fn present(&self) -> Result<()> {
        Fake::present(self)
    }

    async fn list(&self, object_type: &str) -> Result<Vec<String>> {
        Fake::list(self, object_type)
    }

    async fn list_rules(&self, chain: &str) -> Result<Vec<Rule>> {
        Fake::list_rules(self, chain).map(<[Rule]>::to_vec)
    }

    async fn list_elements(&self, object_type: &str, name: &str) -> Result<Vec<Element>> {
        Fake::list_elements(self, object_type, name).map(<[Element]>::to_vec)
    }

    fn define(&mut self, name: &str, value: &str) {
        Fake::define(self, name, value);
    }

    async fn run(&mut self, tx: Transaction) -> Result<()> {
        Fake::run(self, tx)
    }
}
