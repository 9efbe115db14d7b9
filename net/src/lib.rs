// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet header types and parsing logic for IPv4 / IPv6 translation.
//!
//! This crate wraps [`etherparse`] header types in newtypes which maintain
//! the invariants the translation engine relies on (unicast source
//! addresses, non-zero ports, bounded field values), and provides the
//! [`parse::Parse`] / [`parse::DeParse`] traits used to move headers in and
//! out of packet buffers.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub mod buffer;
pub mod checksum;
pub mod headers;
pub mod icmp4;
pub mod icmp6;
pub mod ip;
pub mod ipv4;
pub mod ipv6;
pub mod parse;
pub mod tcp;
pub mod udp;
