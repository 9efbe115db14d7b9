// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Text configuration protocol.
//!
//! Configuration arrives as whitespace-separated `key value` token pairs,
//! e.g. `local.v4 192.0.2.0/24 local.style RFC6052 remote.v6 64:ff9b::/96`.
//! The keys address one side of a rule pair (`local.` / `remote.`) or the
//! instance (`debug`).  Parsing is staged: callers apply a line to a copy of
//! the pair and commit only when the whole line parsed and the result
//! validates, so a rejected line leaves the installed rules untouched.

use crate::rule::{RuleError, RulePair, UnknownStyle, XlateRule};
use crate::table::NoSuchPair;
use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};

/// A configuration line was rejected.  Nothing was committed.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A key is not part of the grammar.
    #[error("unknown configuration key {0:?}")]
    UnknownKey(String),
    /// The line ended where a value was expected.
    #[error("key {0:?} is missing its value")]
    MissingValue(String),
    /// An address or prefix did not parse or is out of range.
    #[error("bad address or prefix {value:?} for key {key:?}")]
    BadAddress {
        /// The key being set.
        key: String,
        /// The offending token.
        value: String,
    },
    /// A numeric value did not parse or is out of range.
    #[error("bad number {value:?} for key {key:?}")]
    BadNumber {
        /// The key being set.
        key: String,
        /// The offending token.
        value: String,
    },
    /// The style token is not one of `NONE`, `MAP`, `MAP0`, `RFC6052`.
    #[error(transparent)]
    UnknownStyle(#[from] UnknownStyle),
    /// The staged pair violates a rule invariant.
    #[error(transparent)]
    Rule(#[from] RuleError),
    /// The addressed pair does not exist.
    #[error(transparent)]
    NoSuchPair(#[from] NoSuchPair),
    /// `set_config` / `get_config` with no pair installed.
    #[error("no rule pairs are installed")]
    NoPairs,
}

fn parse_v4_prefix(current: Ipv4Net, key: &str, value: &str) -> Result<Ipv4Net, ConfigError> {
    let bad = || ConfigError::BadAddress {
        key: key.to_string(),
        value: value.to_string(),
    };
    match value.split_once('/') {
        Some((addr, len)) => {
            let addr: Ipv4Addr = addr.parse().map_err(|_| bad())?;
            let len: u8 = len.parse().map_err(|_| bad())?;
            Ipv4Net::new(addr, len).map_err(|_| bad())
        }
        // A bare address keeps the rule's current prefix length
        None => {
            let addr: Ipv4Addr = value.parse().map_err(|_| bad())?;
            Ipv4Net::new(addr, current.prefix_len()).map_err(|_| bad())
        }
    }
}

fn parse_v6_prefix(current: Ipv6Net, key: &str, value: &str) -> Result<Ipv6Net, ConfigError> {
    let bad = || ConfigError::BadAddress {
        key: key.to_string(),
        value: value.to_string(),
    };
    match value.split_once('/') {
        Some((addr, len)) => {
            let addr: Ipv6Addr = addr.parse().map_err(|_| bad())?;
            let len: u8 = len.parse().map_err(|_| bad())?;
            Ipv6Net::new(addr, len).map_err(|_| bad())
        }
        None => {
            let addr: Ipv6Addr = value.parse().map_err(|_| bad())?;
            Ipv6Net::new(addr, current.prefix_len()).map_err(|_| bad())
        }
    }
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn apply_rule_key(rule: &mut XlateRule, key: &str, sub: &str, value: &str) -> Result<(), ConfigError> {
    match sub {
        "v4" => rule.v4_prefix = parse_v4_prefix(rule.v4_prefix, key, value)?,
        "v6" => rule.v6_prefix = parse_v6_prefix(rule.v6_prefix, key, value)?,
        "style" => rule.style = value.parse()?,
        "ea-len" => rule.ea_len = parse_u8(key, value)?,
        "psid-offset" => rule.psid_offset = parse_u8(key, value)?,
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }
    Ok(())
}

/// Apply one configuration line to a staged pair and debug level.
///
/// Tokens are applied left to right; the first malformed token aborts the
/// line.  Callers must validate the pair before committing it.
///
/// # Errors
///
/// Returns the [`ConfigError`] for the first rejected token.
pub fn apply(pair: &mut RulePair, debug: &mut u8, text: &str) -> Result<(), ConfigError> {
    let mut tokens = text.split_whitespace();
    while let Some(key) = tokens.next() {
        let value = tokens
            .next()
            .ok_or_else(|| ConfigError::MissingValue(key.to_string()))?;
        if key == "debug" {
            *debug = parse_u8(key, value)?;
        } else if let Some(sub) = key.strip_prefix("local.") {
            apply_rule_key(&mut pair.local, key, sub, value)?;
        } else if let Some(sub) = key.strip_prefix("remote.") {
            apply_rule_key(&mut pair.remote, key, sub, value)?;
        } else {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }
    }
    Ok(())
}

fn format_rule(out: &mut String, side: &str, rule: &XlateRule) {
    use std::fmt::Write;
    write!(
        out,
        "{side}.v4 {v4} {side}.v6 {v6} {side}.style {style} \
         {side}.ea-len {ea} {side}.psid-offset {off}",
        v4 = rule.v4_prefix,
        v6 = rule.v6_prefix,
        style = rule.style,
        ea = rule.ea_len,
        off = rule.psid_offset,
    )
    .unwrap_or_else(|_| unreachable!());
}

/// Serialize a pair and the debug level back to the config grammar, one
/// line, in canonical key order.  The output re-applies to an identical
/// pair.
#[must_use]
pub fn format(pair: &RulePair, debug: u8) -> String {
    let mut out = String::new();
    format_rule(&mut out, "local", &pair.local);
    out.push(' ');
    format_rule(&mut out, "remote", &pair.remote);
    out.push_str(&format!(" debug {debug}"));
    out
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::{ConfigError, apply, format};
    use crate::rule::{RulePair, XlateStyle};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_a_full_line() {
        let mut pair = RulePair::default();
        let mut debug = 0;
        apply(
            &mut pair,
            &mut debug,
            "local.v4 192.0.2.0/24 local.v6 2001:db8::/40 local.style MAP \
             local.ea-len 16 local.psid-offset 6 \
             remote.v4 0.0.0.0/0 remote.v6 64:ff9b::/96 remote.style RFC6052 \
             debug 3",
        )
        .unwrap();
        assert_eq!(pair.local.style, XlateStyle::Map);
        assert_eq!(pair.local.v4_prefix.to_string(), "192.0.2.0/24");
        assert_eq!(pair.local.ea_len, 16);
        assert_eq!(pair.local.psid_offset, 6);
        assert_eq!(pair.remote.style, XlateStyle::Rfc6052);
        assert_eq!(pair.remote.v6_prefix.to_string(), "64:ff9b::/96");
        assert_eq!(debug, 3);
    }

    #[test]
    fn bare_address_keeps_prefix_length() {
        let mut pair = RulePair::default();
        let mut debug = 0;
        apply(&mut pair, &mut debug, "local.v4 192.0.2.0/24").unwrap();
        apply(&mut pair, &mut debug, "local.v4 198.51.100.0").unwrap();
        assert_eq!(pair.local.v4_prefix.to_string(), "198.51.100.0/24");
    }

    #[test]
    fn rejects_malformed_tokens() {
        let mut pair = RulePair::default();
        let mut debug = 0;
        assert!(matches!(
            apply(&mut pair, &mut debug, "local.v4"),
            Err(ConfigError::MissingValue(_))
        ));
        assert!(matches!(
            apply(&mut pair, &mut debug, "local.v4 not-an-address"),
            Err(ConfigError::BadAddress { .. })
        ));
        assert!(matches!(
            apply(&mut pair, &mut debug, "local.v4 192.0.2.0/33"),
            Err(ConfigError::BadAddress { .. })
        ));
        assert!(matches!(
            apply(&mut pair, &mut debug, "local.style BOGUS"),
            Err(ConfigError::UnknownStyle(_))
        ));
        assert!(matches!(
            apply(&mut pair, &mut debug, "local.frobnicate 1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            apply(&mut pair, &mut debug, "bogus 1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            apply(&mut pair, &mut debug, "local.ea-len many"),
            Err(ConfigError::BadNumber { .. })
        ));
    }

    #[test]
    fn format_round_trips_through_apply() {
        let mut pair = RulePair::default();
        let mut debug = 0;
        apply(
            &mut pair,
            &mut debug,
            "local.v4 192.0.2.0/24 local.v6 2001:db8::/40 local.style MAP \
             local.ea-len 16 local.psid-offset 6 \
             remote.v4 0.0.0.0/0 remote.v6 64:ff9b::/96 remote.style RFC6052 \
             debug 5",
        )
        .unwrap();

        let line = format(&pair, debug);
        let mut pair2 = RulePair::default();
        let mut debug2 = 0;
        apply(&mut pair2, &mut debug2, &line).unwrap();
        assert_eq!(pair2, pair);
        assert_eq!(debug2, debug);
        // canonical order
        assert!(line.starts_with("local.v4 192.0.2.0/24 local.v6 2001:db8::/40"));
        assert!(line.ends_with("debug 5"));
    }
}
