// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Rule storage and longest-prefix-match lookup.
//!
//! The canonical pair list keeps configuration order; four index views over
//! it are kept sorted by descending prefix length, one per lookup kind.
//! Rule counts are small, so a linear scan of the right view beats a trie.

use crate::rule::{RuleError, RulePair};
use std::net::IpAddr;
use tracing::debug;

/// Which rule side and address family a lookup keys on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Match the local rule's v4 prefix.
    V4Local,
    /// Match the remote rule's v4 prefix.
    V4Remote,
    /// Match the local rule's v6 prefix.
    V6Local,
    /// Match the remote rule's v6 prefix.
    V6Remote,
}

/// The index does not refer to an installed pair.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
#[error("no rule pair at index {index} (table holds {len})")]
pub struct NoSuchPair {
    /// The requested index.
    pub index: usize,
    /// The number of installed pairs.
    pub len: usize,
}

/// The ordered rule pair list plus its four sorted lookup views.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    pairs: Vec<RulePair>,
    // Index views over `pairs`, sorted by descending prefix length of the
    // named side.  Always a permutation of 0..pairs.len().
    by_v4_local: Vec<usize>,
    by_v4_remote: Vec<usize>,
    by_v6_local: Vec<usize>,
    by_v6_remote: Vec<usize>,
}

impl RuleTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of installed pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if no pairs are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Get the pair at `index` (insertion order).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&RulePair> {
        self.pairs.get(index)
    }

    /// Get the most recently added pair.
    #[must_use]
    pub fn last(&self) -> Option<&RulePair> {
        self.pairs.last()
    }

    /// Append a validated pair and rebuild the lookup views.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] (and leaves the table untouched) if the pair
    /// violates the rule invariants.
    pub fn add_pair(&mut self, pair: RulePair) -> Result<(), RuleError> {
        pair.validate()?;
        self.pairs.push(pair);
        self.rebuild_views();
        Ok(())
    }

    /// Replace the pair at `index` and rebuild the lookup views.
    ///
    /// The replacement is transactional: on error the installed pairs and
    /// all views are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`NoSuchPair`] if `index` is out of range; the caller is
    /// responsible for validating the pair first (the config layer stages
    /// and validates before committing here).
    pub fn replace(&mut self, index: usize, pair: RulePair) -> Result<(), NoSuchPair> {
        let len = self.pairs.len();
        let slot = self.pairs.get_mut(index).ok_or(NoSuchPair { index, len })?;
        *slot = pair;
        self.rebuild_views();
        Ok(())
    }

    fn rebuild_views(&mut self) {
        let indices: Vec<usize> = (0..self.pairs.len()).collect();
        let sorted = |key: fn(&RulePair) -> u8| {
            let mut view = indices.clone();
            // Stable sort: ties keep insertion order
            view.sort_by_key(|&i| std::cmp::Reverse(key(&self.pairs[i])));
            view
        };
        self.by_v4_local = sorted(|p| p.local.v4_prefix.prefix_len());
        self.by_v4_remote = sorted(|p| p.remote.v4_prefix.prefix_len());
        self.by_v6_local = sorted(|p| p.local.v6_prefix.prefix_len());
        self.by_v6_remote = sorted(|p| p.remote.v6_prefix.prefix_len());
    }

    /// Longest-prefix-match lookup of `addr` against the `kind` side of
    /// every pair.  Returns the first (longest-prefix) match, or `None` if
    /// no pair covers the address.
    #[must_use]
    pub fn lookup(&self, kind: RuleKind, addr: IpAddr) -> Option<&RulePair> {
        let view = match kind {
            RuleKind::V4Local => &self.by_v4_local,
            RuleKind::V4Remote => &self.by_v4_remote,
            RuleKind::V6Local => &self.by_v6_local,
            RuleKind::V6Remote => &self.by_v6_remote,
        };
        for &i in view {
            let pair = &self.pairs[i];
            let rule = match kind {
                RuleKind::V4Local | RuleKind::V6Local => &pair.local,
                RuleKind::V4Remote | RuleKind::V6Remote => &pair.remote,
            };
            let matches = match (kind, addr) {
                (RuleKind::V4Local | RuleKind::V4Remote, IpAddr::V4(v4)) => {
                    rule.v4_prefix.contains(&v4)
                }
                (RuleKind::V6Local | RuleKind::V6Remote, IpAddr::V6(v6)) => {
                    rule.v6_prefix.contains(&v6)
                }
                _ => false,
            };
            if matches {
                return Some(pair);
            }
        }
        debug!("no rule pair covers {addr} ({kind:?})");
        None
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::{RuleKind, RuleTable};
    use crate::rule::{RulePair, XlateRule, XlateStyle};
    use std::net::IpAddr;

    fn pair(v4: &str, v6: &str) -> RulePair {
        RulePair {
            local: XlateRule {
                style: XlateStyle::Rfc6052,
                v4_prefix: v4.parse().unwrap(),
                v6_prefix: v6.parse().unwrap(),
                ..XlateRule::default()
            },
            remote: XlateRule {
                style: XlateStyle::Rfc6052,
                v4_prefix: v4.parse().unwrap(),
                v6_prefix: v6.parse().unwrap(),
                ..XlateRule::default()
            },
        }
    }

    #[test]
    fn longest_prefix_wins_regardless_of_insertion_order() {
        let mut table = RuleTable::new();
        table.add_pair(pair("10.0.0.0/8", "2001:db8::/32")).unwrap();
        table.add_pair(pair("10.1.0.0/16", "2001:db8:1::/48")).unwrap();
        table.add_pair(pair("10.1.2.0/24", "2001:db8:1:2::/64")).unwrap();

        let hit = table
            .lookup(RuleKind::V4Local, "10.1.2.3".parse::<IpAddr>().unwrap())
            .unwrap();
        assert_eq!(hit.local.v4_prefix.prefix_len(), 24);

        let hit = table
            .lookup(RuleKind::V4Local, "10.1.3.3".parse::<IpAddr>().unwrap())
            .unwrap();
        assert_eq!(hit.local.v4_prefix.prefix_len(), 16);

        let hit = table
            .lookup(RuleKind::V4Remote, "10.9.9.9".parse::<IpAddr>().unwrap())
            .unwrap();
        assert_eq!(hit.remote.v4_prefix.prefix_len(), 8);

        assert!(
            table
                .lookup(RuleKind::V4Local, "11.0.0.1".parse::<IpAddr>().unwrap())
                .is_none()
        );

        let hit = table
            .lookup(
                RuleKind::V6Local,
                "2001:db8:1:2::99".parse::<IpAddr>().unwrap(),
            )
            .unwrap();
        assert_eq!(hit.local.v6_prefix.prefix_len(), 64);
    }

    #[test]
    fn replace_rebuilds_views() {
        let mut table = RuleTable::new();
        table.add_pair(pair("10.0.0.0/8", "2001:db8::/32")).unwrap();
        table.add_pair(pair("192.0.2.0/24", "2001:db8:2::/48")).unwrap();

        table.replace(0, pair("10.1.0.0/16", "2001:db8:3::/48")).unwrap();
        let hit = table
            .lookup(RuleKind::V4Local, "10.1.0.1".parse::<IpAddr>().unwrap())
            .unwrap();
        assert_eq!(hit.local.v4_prefix.prefix_len(), 16);
        assert!(
            table
                .lookup(RuleKind::V4Local, "10.2.0.1".parse::<IpAddr>().unwrap())
                .is_none()
        );
        assert!(table.replace(5, pair("10.0.0.0/8", "2001:db8::/32")).is_err());
    }

    #[test]
    fn family_mismatch_never_matches() {
        let mut table = RuleTable::new();
        table.add_pair(pair("10.0.0.0/8", "2001:db8::/96")).unwrap();
        assert!(
            table
                .lookup(RuleKind::V4Local, "2001:db8::1".parse::<IpAddr>().unwrap())
                .is_none()
        );
        assert!(
            table
                .lookup(RuleKind::V6Local, "192.0.2.1".parse::<IpAddr>().unwrap())
                .is_none()
        );
    }
}
