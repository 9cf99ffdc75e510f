//! Deterministic text rendering of a [`Fake`]
//!
//! The dump looks like an `nft -f` script made only of `add` operations, but
//! it is a diagnostic, not a replayable script (a rule may, for example, jump
//! to a chain that is dumped after it).
//!
//! Order: the table, then every chain by name with its rules, then every set
//! by name with its elements, then every map likewise. Rules and elements
//! keep their recorded order. Handles and index hints are left out so two
//! stores with the same contents dump identically.

use crate::core::fake::Fake;
use crate::core::objects::{Chain, Element, Family, Map, Rule, Set, SetFlag, SetPolicy, Table};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Table-level prefix shared by every line: `<family> <table>`
struct Target<'a> {
    family: Family,
    table: &'a str,
}

impl Fake {
    /// Renders the current contents. An empty store renders as `""`.
    pub fn dump(&self) -> String {
        let Some(table) = self.table() else {
            return String::new();
        };

        let target = Target {
            family: self.family(),
            table: self.table_name(),
        };
        let mut out = String::new();

        write_table(&mut out, &target, &table.table);

        for fake_chain in table.chains.values() {
            write_chain(&mut out, &target, &fake_chain.chain);
            for rule in &fake_chain.rules {
                write_rule(&mut out, &target, rule);
            }
        }

        for fake_set in table.sets.values() {
            write_set(&mut out, &target, &fake_set.set);
            for element in &fake_set.elements {
                write_element(&mut out, &target, element);
            }
        }

        for fake_map in table.maps.values() {
            write_map(&mut out, &target, &fake_map.map);
            for element in &fake_map.elements {
                write_element(&mut out, &target, element);
            }
        }

        out
    }

    /// SHA-256 of [`Fake::dump`], as lowercase hex
    pub fn dump_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.dump().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Line diff between two dumps, for readable assertion failures.
///
/// Returns `None` when the dumps are identical.
pub fn diff_dumps(expected: &str, actual: &str) -> Option<String> {
    if expected == actual {
        return None;
    }

    let diff = similar::TextDiff::from_lines(expected, actual);
    let mut result = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            similar::ChangeTag::Delete => "- ",
            similar::ChangeTag::Insert => "+ ",
            similar::ChangeTag::Equal => "  ",
        };
        let _ = write!(result, "{sign}{change}");
        if change.missing_newline() {
            let _ = writeln!(result);
        }
    }
    Some(result)
}

fn write_table(out: &mut String, target: &Target<'_>, table: &Table) {
    let _ = write!(out, "add table {} {}", target.family, target.table);
    if let Some(ref comment) = table.comment {
        let _ = write!(out, " {{ comment \"{comment}\" ; }}");
    }
    let _ = writeln!(out);
}

fn write_chain(out: &mut String, target: &Target<'_>, chain: &Chain) {
    let _ = write!(
        out,
        "add chain {} {} {}",
        target.family, target.table, chain.name
    );

    if chain.chain_type.is_some() || chain.comment.is_some() {
        let _ = write!(out, " {{");
        if let (Some(chain_type), Some(hook), Some(priority)) =
            (&chain.chain_type, &chain.hook, &chain.priority)
        {
            let _ = write!(out, " type {chain_type} hook {hook}");
            if let Some(ref device) = chain.device {
                let _ = write!(out, " device \"{device}\"");
            }
            let _ = write!(out, " priority {priority} ;");
        }
        if let Some(ref comment) = chain.comment {
            let _ = write!(out, " comment \"{comment}\" ;");
        }
        let _ = write!(out, " }}");
    }
    let _ = writeln!(out);
}

fn write_rule(out: &mut String, target: &Target<'_>, rule: &Rule) {
    let _ = write!(
        out,
        "add rule {} {} {} {}",
        target.family, target.table, rule.chain, rule.text
    );
    if let Some(ref comment) = rule.comment {
        let _ = write!(out, " comment \"{comment}\"");
    }
    let _ = writeln!(out);
}

/// Attributes shared by sets and maps
struct CollectionBody<'a> {
    type_desc: Option<&'a str>,
    type_of: Option<&'a str>,
    flags: &'a [SetFlag],
    timeout: Option<u64>,
    gc_interval: Option<u64>,
    size: Option<u64>,
    policy: Option<SetPolicy>,
    auto_merge: bool,
    comment: Option<&'a str>,
}

fn write_collection_body(out: &mut String, body: &CollectionBody<'_>) {
    let _ = write!(out, " {{");
    if let Some(type_desc) = body.type_desc {
        let _ = write!(out, " type {type_desc} ;");
    } else if let Some(type_of) = body.type_of {
        let _ = write!(out, " typeof {type_of} ;");
    }
    if !body.flags.is_empty() {
        let flags: Vec<&str> = body.flags.iter().map(AsRef::as_ref).collect();
        let _ = write!(out, " flags {} ;", flags.join(","));
    }
    if let Some(timeout) = body.timeout {
        let _ = write!(out, " timeout {timeout}s ;");
    }
    if let Some(gc_interval) = body.gc_interval {
        let _ = write!(out, " gc-interval {gc_interval}s ;");
    }
    if let Some(size) = body.size {
        let _ = write!(out, " size {size} ;");
    }
    if let Some(policy) = body.policy {
        let _ = write!(out, " policy {policy} ;");
    }
    if body.auto_merge {
        let _ = write!(out, " auto-merge ;");
    }
    if let Some(comment) = body.comment {
        let _ = write!(out, " comment \"{comment}\" ;");
    }
    let _ = write!(out, " }}");
}

fn write_set(out: &mut String, target: &Target<'_>, set: &Set) {
    let _ = write!(out, "add set {} {} {}", target.family, target.table, set.name);
    write_collection_body(
        out,
        &CollectionBody {
            type_desc: set.set_type.as_deref(),
            type_of: set.type_of.as_deref(),
            flags: &set.flags,
            timeout: set.timeout,
            gc_interval: set.gc_interval,
            size: set.size,
            policy: set.policy,
            auto_merge: set.auto_merge.unwrap_or(false),
            comment: set.comment.as_deref(),
        },
    );
    let _ = writeln!(out);
}

fn write_map(out: &mut String, target: &Target<'_>, map: &Map) {
    let _ = write!(out, "add map {} {} {}", target.family, target.table, map.name);
    write_collection_body(
        out,
        &CollectionBody {
            type_desc: map.map_type.as_deref(),
            type_of: map.type_of.as_deref(),
            flags: &map.flags,
            timeout: map.timeout,
            gc_interval: map.gc_interval,
            size: map.size,
            policy: map.policy,
            auto_merge: false,
            comment: map.comment.as_deref(),
        },
    );
    let _ = writeln!(out);
}

fn write_element(out: &mut String, target: &Target<'_>, element: &Element) {
    let _ = write!(
        out,
        "add element {} {} {} {{ {}",
        target.family, target.table, element.name, element.key
    );
    if element.is_map_element()
        && let Some(ref value) = element.value
    {
        let _ = write!(out, " : {value}");
    }
    if let Some(ref comment) = element.comment {
        let _ = write!(out, " comment \"{comment}\"");
    }
    let _ = writeln!(out, " }}");
}
