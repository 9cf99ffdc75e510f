//! `$NAME` placeholder substitution
//!
//! Defines are applied exactly once, when a string field is first committed
//! to the store. Stored strings are never re-expanded, so registering a new
//! define later has no effect on what is already there.

use crate::core::objects::Family;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Sigil that introduces a placeholder
const SIGIL: char = '$';

/// A single `$name` → `value` substitution rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: String,
}

impl Define {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered define list. Earlier registrations win on overlapping names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defines {
    defines: Vec<Define>,
}

impl Defines {
    /// Defaults every table of `family` starts with
    pub fn for_family(family: Family) -> Self {
        let defines = match family {
            Family::Ip => vec![
                Define::new("IP", "ip"),
                Define::new("INET_ADDR_TYPE", "ipv4_addr"),
            ],
            Family::Ip6 => vec![
                Define::new("IP", "ip6"),
                Define::new("INET_ADDR_TYPE", "ipv6_addr"),
            ],
            _ => Vec::new(),
        };
        Self { defines }
    }

    pub fn register(&mut self, define: Define) {
        self.defines.push(define);
    }

    /// Defines in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Define> {
        self.defines.iter()
    }

    pub fn len(&self) -> usize {
        self.defines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Replaces every `$name` in `input` with its value.
    ///
    /// Single left-to-right pass: substituted text is copied verbatim and
    /// never rescanned. At each sigil the first registered define whose
    /// name matches is used; unmatched sigils are kept as-is.
    pub fn substitute(&self, input: &str) -> String {
        if self.defines.is_empty() || !input.contains(SIGIL) {
            return input.to_string();
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find(SIGIL) {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + SIGIL.len_utf8()..];

            match self
                .defines
                .iter()
                .find(|d| !d.name.is_empty() && after.starts_with(d.name.as_str()))
            {
                Some(define) => {
                    out.push_str(&define.value);
                    rest = &after[define.name.len()..];
                }
                None => {
                    out.push(SIGIL);
                    rest = after;
                }
            }
        }
        out.push_str(rest);

        trace!("Substituted defines: {input:?} -> {out:?}");
        out
    }

    /// Substitutes an optional field, leaving `None` untouched
    pub fn substitute_opt(&self, input: Option<&str>) -> Option<String> {
        input.map(|s| self.substitute(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_defaults() {
        let ip = Defines::for_family(Family::Ip);
        assert_eq!(ip.substitute("$IP daddr"), "ip daddr");
        assert_eq!(ip.substitute("type $INET_ADDR_TYPE"), "type ipv4_addr");

        let ip6 = Defines::for_family(Family::Ip6);
        assert_eq!(ip6.substitute("$IP saddr"), "ip6 saddr");
        assert_eq!(ip6.substitute("$INET_ADDR_TYPE"), "ipv6_addr");

        assert!(Defines::for_family(Family::Inet).is_empty());
        assert!(Defines::for_family(Family::Bridge).is_empty());
    }

    #[test]
    fn test_substitute_every_occurrence() {
        let mut defines = Defines::default();
        defines.register(Define::new("VIP", "10.0.0.1"));
        assert_eq!(
            defines.substitute("ip daddr $VIP ip saddr $VIP drop"),
            "ip daddr 10.0.0.1 ip saddr 10.0.0.1 drop"
        );
    }

    #[test]
    fn test_earlier_define_wins_on_overlap() {
        let mut defines = Defines::default();
        defines.register(Define::new("IP", "ip"));
        defines.register(Define::new("IP6", "ip6"));

        // "$IP6" is consumed by the earlier "IP" define
        assert_eq!(defines.substitute("$IP6 daddr"), "ip6 daddr");
        assert_eq!(defines.substitute("$IP6"), "ip6");

        let mut reversed = Defines::default();
        reversed.register(Define::new("IP6", "v6"));
        reversed.register(Define::new("IP", "v4"));
        assert_eq!(reversed.substitute("$IP6 $IP"), "v6 v4");
    }

    #[test]
    fn test_no_recursive_expansion() {
        let mut defines = Defines::default();
        defines.register(Define::new("A", "$B"));
        defines.register(Define::new("B", "boom"));
        assert_eq!(defines.substitute("$A"), "$B");
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let mut defines = Defines::default();
        defines.register(Define::new("KNOWN", "x"));
        assert_eq!(defines.substitute("$UNKNOWN $KNOWN $"), "$UNKNOWN x $");
    }

    #[test]
    fn test_substitute_opt() {
        let defines = Defines::for_family(Family::Ip);
        assert_eq!(defines.substitute_opt(None), None);
        assert_eq!(
            defines.substitute_opt(Some("$IP")),
            Some("ip".to_string())
        );
    }
}
