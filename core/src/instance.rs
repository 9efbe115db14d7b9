// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The translation engine instance.
//!
//! A [`Nat46`] owns the rule table, the CE port allocator and the IPv4
//! identification counter.  Packet translation runs synchronously on the
//! calling thread; the rule table sits behind a writer-exclusive lock so the
//! packet path (readers) and the configuration path (writers) can run
//! concurrently, and the counters are atomics.  All sync primitives come
//! from the `concurrency` facade so the same code can be model-checked.

use crate::config::{self, ConfigError};
use crate::portalloc::CePortAllocator;
use crate::rule::{RuleError, RulePair, XlateRule};
use crate::table::{NoSuchPair, RuleTable};
use crate::xlate;
use concurrency::sync::atomic::{AtomicU8, AtomicU16, Ordering};
use concurrency::sync::{RwLock, RwLockReadGuard};
use net::buffer::PacketBufferMut;

/// Why the engine decided to discard a packet.
///
/// Every variant is a silent drop: the engine never originates ICMP.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// No rule pair covers the packet's addresses.
    NoMatchingRule,
    /// The packet (or the packet embedded in an ICMP error) is truncated or
    /// structurally invalid.
    Malformed,
    /// The ICMP message type has no counterpart in the other family.
    UnsupportedIcmp,
    /// An ICMP error carries another ICMP error; translation depth is
    /// limited to one.
    NestedIcmpError,
    /// The packet embedded in an ICMP error uses a transport the engine
    /// cannot extract ports from.
    UnsupportedInnerTransport,
    /// A fragmented ICMPv4 message cannot be translated (the ICMPv6
    /// checksum needs the full payload).
    FragmentedIcmp,
    /// The caller's reassembler gave up on a fragmented ICMPv6 payload.
    ReassemblyFailed,
}

/// The outcome of a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The buffer now holds the rewritten packet; send it.
    Forward,
    /// Discard the packet.
    Drop(DropReason),
    /// A reassembler consumed the fragment; there is nothing to send.
    Absorbed,
}

/// The buffer cannot accommodate the header growth.
///
/// The caller may grow the buffer's head/tail room and retry once; the
/// packet itself was not modified.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Insufficient head or tail room.
    #[error("buffer lacks {needed} bytes of room (has {available})")]
    BufferTooSmall {
        /// Bytes of room the translation needs.
        needed: u16,
        /// Bytes of room the buffer has.
        available: u16,
    },
}

/// What a [`FragmentReassembler`] did with a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyOutcome {
    /// The fragment was queued; more are needed.
    Pending,
    /// All fragments arrived; here is the reassembled packet.
    Complete(Vec<u8>),
    /// Reassembly cannot complete (timeout, overlap, resource limit).
    Failed,
}

/// Caller-supplied IPv6 reassembly.
///
/// Invoked only for fragmented (non-atomic) ICMPv6 payloads, whose checksum
/// covers the full payload length and therefore cannot be translated
/// fragment by fragment.
pub trait FragmentReassembler {
    /// Offer one complete IPv6 packet (a fragment) to the reassembler.
    fn add_fragment(&mut self, packet: &[u8]) -> ReassemblyOutcome;
}

/// A reassembler that never reassembles.  Fragmented ICMPv6 drops.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullReassembler;

impl FragmentReassembler for NullReassembler {
    fn add_fragment(&mut self, _packet: &[u8]) -> ReassemblyOutcome {
        ReassemblyOutcome::Failed
    }
}

/// One translation engine instance.
#[derive(Debug, Default)]
pub struct Nat46 {
    table: RwLock<RuleTable>,
    ce_ports: CePortAllocator,
    ip_id: AtomicU16,
    debug: AtomicU8,
    add_dummy_fragment_header: bool,
}

impl Nat46 {
    /// An engine with no rules installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine which adds an atomic fragment header when translating
    /// unfragmented, DF-clear IPv4 packets, advertising the 16-bit
    /// identification space to the IPv6 side.
    #[must_use]
    pub fn with_dummy_fragment_header() -> Self {
        Self {
            add_dummy_fragment_header: true,
            ..Self::default()
        }
    }

    /// The number of installed rule pairs.
    #[must_use]
    pub fn num_pairs(&self) -> usize {
        self.read_table().len()
    }

    /// The stored debug level (serialized back by [`Nat46::get_config`]).
    #[must_use]
    pub fn debug_level(&self) -> u8 {
        self.debug.load(Ordering::Relaxed)
    }

    /// Install a new rule pair after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] if the pair violates the rule invariants;
    /// the installed rules are unchanged.
    pub fn add_pair(&self, pair: RulePair) -> Result<(), RuleError> {
        self.write_table().add_pair(pair)
    }

    /// Install an unconfigured rule pair, to be filled in by
    /// [`Nat46::set_config`].
    pub fn add_empty_pair(&self) {
        self.write_table()
            .add_pair(RulePair::default())
            .unwrap_or_else(|_| unreachable!());
    }

    /// Apply a configuration line to the most recently added pair.
    ///
    /// The apply is transactional: it is staged on a copy and committed
    /// only once the whole line parses and the result validates.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`]; the installed rules are unchanged.
    pub fn set_config(&self, text: &str) -> Result<(), ConfigError> {
        let index = self.read_table().len().checked_sub(1);
        self.set_config_at(index.ok_or(ConfigError::NoPairs)?, text)
    }

    /// Apply a configuration line to the pair at `index` (insertion order).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`]; the installed rules are unchanged.
    pub fn set_config_at(&self, index: usize, text: &str) -> Result<(), ConfigError> {
        let mut table = self.write_table();
        let mut staged = table
            .get(index)
            .ok_or(NoSuchPair {
                index,
                len: table.len(),
            })?
            .clone();
        let mut debug = self.debug.load(Ordering::Relaxed);
        config::apply(&mut staged, &mut debug, text)?;
        staged.validate()?;
        table.replace(index, staged)?;
        self.debug.store(debug, Ordering::Relaxed);
        Ok(())
    }

    /// Serialize the most recently added pair to the config grammar.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPairs`] when no pair is installed.
    pub fn get_config(&self) -> Result<String, ConfigError> {
        let index = self.read_table().len().checked_sub(1);
        self.get_config_at(index.ok_or(ConfigError::NoPairs)?)
    }

    /// Serialize the pair at `index` to the config grammar.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSuchPair`] for an out-of-range index.
    pub fn get_config_at(&self, index: usize) -> Result<String, ConfigError> {
        let table = self.read_table();
        let pair = table.get(index).ok_or(NoSuchPair {
            index,
            len: table.len(),
        })?;
        Ok(config::format(pair, self.debug.load(Ordering::Relaxed)))
    }

    /// Translate the IPv6 packet in `buf` to IPv4, in place.
    ///
    /// `reasm` is consulted only for fragmented (non-atomic) ICMPv6
    /// payloads; use [`NullReassembler`] to drop those instead.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::BufferTooSmall`] when the reassembled
    /// packet does not fit; the caller may grow the buffer and retry once.
    pub fn translate_v6_to_v4<Buf: PacketBufferMut>(
        &self,
        buf: &mut Buf,
        reasm: &mut impl FragmentReassembler,
    ) -> Result<Verdict, TranslationError> {
        xlate::v6to4::translate(self, buf, reasm)
    }

    /// Translate the IPv4 packet in `buf` to IPv6, in place.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::BufferTooSmall`] when the buffer lacks
    /// the head or tail room for header growth; the caller may grow the
    /// buffer and retry once.
    pub fn translate_v4_to_v6<Buf: PacketBufferMut>(
        &self,
        buf: &mut Buf,
    ) -> Result<Verdict, TranslationError> {
        xlate::v4to6::translate(self, buf)
    }

    pub(crate) fn read_table(&self) -> RwLockReadGuard<'_, RuleTable> {
        self.table.read().unwrap_or_else(|_| unreachable!())
    }

    fn write_table(&self) -> concurrency::sync::RwLockWriteGuard<'_, RuleTable> {
        self.table.write().unwrap_or_else(|_| unreachable!())
    }

    pub(crate) fn next_ip_id(&self) -> u16 {
        self.ip_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_ce_port(&self, rule: &XlateRule, sport: u16) -> Option<u16> {
        self.ce_ports.next_ce_port(rule, sport)
    }

    pub(crate) fn add_dummy_fragment_header(&self) -> bool {
        self.add_dummy_fragment_header
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::Nat46;
    use crate::config::ConfigError;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_surface_round_trips() {
        let nat46 = Nat46::new();
        assert!(matches!(nat46.set_config("debug 1"), Err(ConfigError::NoPairs)));

        nat46.add_empty_pair();
        nat46
            .set_config(
                "local.v4 192.0.2.0/24 local.v6 2001:db8::/40 local.style MAP \
                 local.ea-len 16 local.psid-offset 6 \
                 remote.v4 0.0.0.0/0 remote.v6 64:ff9b::/96 remote.style RFC6052",
            )
            .unwrap();
        let line = nat46.get_config().unwrap();
        assert!(line.contains("local.style MAP"));
        assert!(line.contains("remote.v6 64:ff9b::/96"));
        assert_eq!(nat46.num_pairs(), 1);
    }

    #[test]
    fn rejected_config_leaves_rules_untouched() {
        let nat46 = Nat46::new();
        nat46.add_empty_pair();
        nat46
            .set_config("local.v4 192.0.2.0/24 local.style RFC6052 local.v6 2001:db8::/32")
            .unwrap();
        let before = nat46.get_config().unwrap();

        // /33 is not an RFC6052 prefix length: the whole line must bounce
        let err = nat46
            .set_config("local.v6 3fff::/33 local.ea-len 7")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Rule(_)));
        assert_eq!(nat46.get_config().unwrap(), before);
    }
}
