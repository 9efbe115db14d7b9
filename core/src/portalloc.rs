// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! CE port allocation for MAP fragment identifiers.
//!
//! A MAP CE shares its IPv4 address with other CEs; only ports whose PSID
//! bits match belong to it.  When this node fragments on the v4→v6 path the
//! fragment identifier should also come from the CE's port set so the far
//! end can attribute fragments to the right CE.  Ports have the shape
//! `[m: psid_offset bits][PSID: psid_len bits][counter: a bits]` (RFC 7597
//! appendix B); this allocator walks the counter, then `m`, skipping the
//! excluded `m = 0` range that contains the well-known ports.
//!
//! This is a wrap-around sequence generator for locally-unique fragment
//! identifiers, not NAT session state.

use crate::rule::XlateRule;
use concurrency::sync::atomic::{AtomicU16, Ordering};

/// The port-set cursor.  One per engine instance.
#[derive(Debug, Default)]
pub struct CePortAllocator {
    cursor: AtomicU16,
}

impl CePortAllocator {
    /// A fresh allocator in the start state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next port from the port-set of `sport`'s PSID under `rule` (the
    /// matched pair's local rule).
    ///
    /// Returns `None` when the rule carries no PSID bits, or when the
    /// computed value is 0; callers fall back to the plain v4 identifier.
    pub fn next_ce_port(&self, rule: &XlateRule, sport: u16) -> Option<u16> {
        let psid_len = rule.psid_len();
        if psid_len == 0 {
            return None;
        }
        let offset = rule.psid_offset;
        let a = 16 - offset - psid_len;
        let psid16 = (sport >> a) & (0xffff >> (16 - psid_len));

        let mut current = self.cursor.load(Ordering::Relaxed);
        loop {
            let next = Self::advance(current, offset, a, psid16);
            match self.cursor.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return if next == 0 { None } else { Some(next) };
                }
                Err(observed) => current = observed,
            }
        }
    }

    // One step of the cursor.  The cursor's own PSID bits are always
    // replaced by the caller's, so every emitted port belongs to the
    // caller's port set.
    fn advance(current: u16, offset: u8, a: u8, psid16: u16) -> u16 {
        let m_bits = |m: u16| if offset == 0 { 0 } else { m << (16 - offset) };
        let first_m = u16::from(offset > 0);

        // Start case
        if current == 0 {
            return m_bits(first_m) | (psid16 << a);
        }

        let counter_mask = (1u16 << a) - 1;
        let counter = current & counter_mask;
        if counter == counter_mask {
            // Port set exhausted: advance m, wrapping past 2^offset - 1
            // back past the excluded m = 0 range.
            let mut m = if offset == 0 { 0 } else { current >> (16 - offset) };
            m += 1;
            if m >= (1 << offset) {
                m = first_m;
            }
            m_bits(m) | (psid16 << a)
        } else {
            let m = if offset == 0 { 0 } else { current >> (16 - offset) };
            m_bits(m) | (psid16 << a) | (counter + 1)
        }
    }
}
