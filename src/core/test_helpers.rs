//! Shared test utilities for core module tests
//!
//! This module is only compiled in test mode.

use crate::core::fake::Fake;
use crate::core::objects::{Chain, Element, Family, Map, Rule, Set, SetFlag, Table};
use crate::core::transaction::Transaction;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Routes `tracing` output through the test harness so it shows up for
/// failing tests only. Safe to call from every test.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A fake whose table already exists
pub fn fake_with_table(family: Family, table: &str) -> Fake {
    let mut fake = Fake::new(family, table);
    let mut tx = Transaction::new();
    tx.add(Table::new());
    fake.run(tx).unwrap_or_else(|e| panic!("adding table failed: {e}"));
    fake
}

/// Applies a transaction built by `build`, panicking on failure
pub fn apply(fake: &mut Fake, build: impl FnOnce(&mut Transaction)) {
    let mut tx = Transaction::new();
    build(&mut tx);
    fake.run(tx).unwrap_or_else(|e| panic!("transaction failed: {e}"));
}

/// A service-proxy shaped ruleset: a base chain dispatching through a
/// verdict map to per-service chains, plus an address set.
pub fn populate_service_proxy(tx: &mut Transaction) {
    tx.add(Table::new().with_comment("rules for kube-proxy"))
        .add(Chain::new("filter-input").with_hook("filter", "input", "-110"))
        .add(Chain::new("services"))
        .add(Chain::new("service-ULMVA6XW-ns1/svc1/tcp/p80"))
        .add(Rule::new("filter-input", "ct state new jump services"))
        .add(Map::new(
            "service-ips",
            "$INET_ADDR_TYPE . inet_proto . inet_service : verdict",
        ))
        .add(Element::map(
            "service-ips",
            "172.30.0.41 . tcp . 80",
            "goto service-ULMVA6XW-ns1/svc1/tcp/p80",
        ))
        .add(Rule::new(
            "services",
            "$IP daddr . meta l4proto . th dport vmap @service-ips",
        ))
        .add(Rule::new(
            "service-ULMVA6XW-ns1/svc1/tcp/p80",
            "$IP daddr 172.30.0.41 dnat to 10.180.0.1:80",
        ))
        .add(Set::new("cluster-ips", "$INET_ADDR_TYPE").with_flags([SetFlag::Interval]))
        .add(Element::set("cluster-ips", "172.30.0.0/16"));
}
