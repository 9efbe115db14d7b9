// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Translation rule model.
//!
//! A rule describes one direction's (local or remote) prefix mapping; a pair
//! combines the near-end and far-end rules.  Rules are built and mutated only
//! through the configuration interface; the packet path reads them.

use ipnet::{Ipv4Net, Ipv6Net};
use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// The mapping algorithm a rule applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum XlateStyle {
    /// No algorithmic mapping: only the exact configured host pair matches.
    #[default]
    None,
    /// MAP-T (RFC 7599), current interface-identifier layout.
    Map,
    /// MAP-T, legacy (draft-00) interface-identifier layout.
    Map0,
    /// RFC 6052 algorithmic prefix embedding.
    Rfc6052,
}

impl Display for XlateStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            XlateStyle::None => "NONE",
            XlateStyle::Map => "MAP",
            XlateStyle::Map0 => "MAP0",
            XlateStyle::Rfc6052 => "RFC6052",
        };
        write!(f, "{s}")
    }
}

/// The string is not one of the recognized style tokens.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unknown translation style {0:?}")]
pub struct UnknownStyle(pub String);

impl FromStr for XlateStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(XlateStyle::None),
            "MAP" => Ok(XlateStyle::Map),
            "MAP0" => Ok(XlateStyle::Map0),
            "RFC6052" => Ok(XlateStyle::Rfc6052),
            other => Err(UnknownStyle(other.to_string())),
        }
    }
}

/// A rule violates the style's structural invariants.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// RFC 6052 only defines prefix lengths 32, 40, 48, 56, 64 and 96.
    #[error("IPv6 prefix length {0} is not valid for RFC6052")]
    BadRfc6052PrefixLen(u8),
    /// MAP EA-bits are limited to 48.
    #[error("EA-bits length {0} exceeds 48")]
    EaLenTooLong(u8),
    /// The PSID must fit in the 16-bit port alongside its offset.
    #[error("PSID of {psid_len} bits at offset {psid_offset} does not fit in a port")]
    PsidOutOfRange {
        /// Derived PSID length in bits.
        psid_len: u8,
        /// Configured PSID offset in bits.
        psid_offset: u8,
    },
}

/// One direction's prefix configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlateRule {
    /// The mapping algorithm.
    pub style: XlateStyle,
    /// The IPv6 side of the mapping.
    pub v6_prefix: Ipv6Net,
    /// The IPv4 side of the mapping.
    pub v4_prefix: Ipv4Net,
    /// Embedded-address bit length (MAP only).
    pub ea_len: u8,
    /// PSID offset from the port's most significant bit (MAP only).
    pub psid_offset: u8,
}

impl Default for XlateRule {
    fn default() -> Self {
        Self {
            style: XlateStyle::None,
            v6_prefix: Ipv6Net::new(Ipv6Addr::UNSPECIFIED, 0).unwrap_or_else(|_| unreachable!()),
            v4_prefix: Ipv4Net::new(Ipv4Addr::UNSPECIFIED, 0).unwrap_or_else(|_| unreachable!()),
            ea_len: 0,
            psid_offset: 0,
        }
    }
}

impl XlateRule {
    /// The number of PSID bits this rule derives from ports.
    ///
    /// Zero when the EA-bits are consumed entirely by v4 address bits.
    #[must_use]
    pub fn psid_len(&self) -> u8 {
        let host_bits = 32 - self.v4_prefix.prefix_len();
        self.ea_len.saturating_sub(host_bits)
    }

    /// Check the style-specific structural invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), RuleError> {
        match self.style {
            XlateStyle::None => Ok(()),
            XlateStyle::Rfc6052 => match self.v6_prefix.prefix_len() {
                32 | 40 | 48 | 56 | 64 | 96 => Ok(()),
                len => Err(RuleError::BadRfc6052PrefixLen(len)),
            },
            XlateStyle::Map | XlateStyle::Map0 => {
                if self.ea_len > 48 {
                    return Err(RuleError::EaLenTooLong(self.ea_len));
                }
                let psid_len = self.psid_len();
                if psid_len + self.psid_offset > 16 {
                    return Err(RuleError::PsidOutOfRange {
                        psid_len,
                        psid_offset: self.psid_offset,
                    });
                }
                Ok(())
            }
        }
    }
}

/// A local/remote rule pair: one configured mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RulePair {
    /// The near-end mapping.
    pub local: XlateRule,
    /// The far-end mapping.
    pub remote: XlateRule,
}

impl RulePair {
    /// A pair takes part in matching only once both sides are configured.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.local.style != XlateStyle::None && self.remote.style != XlateStyle::None
    }

    /// Check both sides' invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] from either side.
    pub fn validate(&self) -> Result<(), RuleError> {
        self.local.validate()?;
        self.remote.validate()
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::{RuleError, XlateRule, XlateStyle};

    fn map_rule(v4: &str, ea_len: u8, psid_offset: u8) -> XlateRule {
        XlateRule {
            style: XlateStyle::Map,
            v4_prefix: v4.parse().unwrap(),
            v6_prefix: "2001:db8::/40".parse().unwrap(),
            ea_len,
            psid_offset,
        }
    }

    #[test]
    fn psid_len_derivation() {
        // /24 leaves 8 host bits; ea 16 = 8 address + 8 psid
        assert_eq!(map_rule("192.0.2.0/24", 16, 0).psid_len(), 8);
        // ea shorter than the host bits: no psid
        assert_eq!(map_rule("192.0.2.0/24", 6, 0).psid_len(), 0);
        assert_eq!(map_rule("192.0.2.0/32", 6, 0).psid_len(), 6);
    }

    #[test]
    fn rfc6052_prefix_lengths() {
        for len in [32u8, 40, 48, 56, 64, 96] {
            let rule = XlateRule {
                style: XlateStyle::Rfc6052,
                v6_prefix: format!("2001:db8::/{len}").parse().unwrap(),
                ..XlateRule::default()
            };
            assert_eq!(rule.validate(), Ok(()));
        }
        let rule = XlateRule {
            style: XlateStyle::Rfc6052,
            v6_prefix: "2001:db8::/33".parse().unwrap(),
            ..XlateRule::default()
        };
        assert_eq!(rule.validate(), Err(RuleError::BadRfc6052PrefixLen(33)));
    }

    #[test]
    fn map_psid_budget() {
        assert_eq!(map_rule("192.0.2.0/24", 16, 6).validate(), Ok(()));
        assert_eq!(
            map_rule("192.0.2.0/24", 16, 9).validate(),
            Err(RuleError::PsidOutOfRange {
                psid_len: 8,
                psid_offset: 9
            })
        );
        assert_eq!(
            map_rule("192.0.2.0/24", 49, 0).validate(),
            Err(RuleError::EaLenTooLong(49))
        );
    }

    #[test]
    fn style_text_forms() {
        for style in [
            XlateStyle::None,
            XlateStyle::Map,
            XlateStyle::Map0,
            XlateStyle::Rfc6052,
        ] {
            assert_eq!(style.to_string().parse::<XlateStyle>().unwrap(), style);
        }
        assert!("rfc6052".parse::<XlateStyle>().is_err());
    }
}
