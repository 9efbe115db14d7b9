// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Stateless IPv4 ↔ IPv6 header translation engine ("nat46").
//!
//! Supports RFC 6052 algorithmic NAT64 prefix mapping and MAP-T (RFC 7599)
//! with PSID-based port sets, including ICMP error-message translation per
//! RFC 6145 and incremental checksum recomputation across protocol families.
//!
//! The engine owns no I/O: callers hand it a mutable packet buffer (with
//! enough head room to absorb the IPv4/IPv6 header-size delta) and receive a
//! [`Verdict`] telling them whether to forward, drop, or do nothing.
//!
//! [`Verdict`]: instance::Verdict

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub mod bitcopy;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod icmp;
pub mod instance;
pub mod portalloc;
pub mod rule;
pub mod table;
pub mod xlate;

pub use instance::{
    DropReason, FragmentReassembler, Nat46, NullReassembler, ReassemblyOutcome, TranslationError,
    Verdict,
};
pub use rule::{RulePair, XlateRule, XlateStyle};
pub use table::{RuleKind, RuleTable};
