// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Incremental internet-checksum arithmetic (RFC 1624).
//!
//! Translation rewrites headers but leaves transport payloads alone, so the
//! transport checksums can be fixed up by folding the removed bytes out and
//! the inserted bytes in, one 16-bit word at a time.  All words are in
//! network byte order.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Fold a 32-bit one's-complement accumulator down to 16 bits with
/// end-around carry.
fn fold(mut sum: u32) -> u16 {
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    #[allow(clippy::cast_possible_truncation)] // folded above
    {
        sum as u16
    }
}

/// Update a checksum for one 16-bit word changing from `old` to `new`
/// (RFC 1624 equation 3: `HC' = ~(~HC + ~m + m')`).
#[must_use]
pub fn update16(csum: u16, old: u16, new: u16) -> u16 {
    let sum = u32::from(!csum) + u32::from(!old) + u32::from(new);
    !fold(sum)
}

/// One's-complement sum of `data` as big-endian 16-bit words, the final odd
/// byte (if any) padded with zero.
fn sum_words(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    sum
}

/// Fold the bytes of `data` into `csum`, as if they had been appended to the
/// checksummed region.
#[must_use]
pub fn add_block(csum: u16, data: &[u8]) -> u16 {
    !fold(u32::from(!csum) + sum_words(data))
}

/// Fold the bytes of `data` out of `csum`, as if they had been removed from
/// the checksummed region.
///
/// Removal is addition of the one's-complement negation of the folded word
/// sum, which keeps the zero padding of an odd final byte out of the result.
#[must_use]
pub fn remove_block(csum: u16, data: &[u8]) -> u16 {
    let negated = !fold(sum_words(data));
    !fold(u32::from(!csum) + u32::from(negated))
}

fn ipv6_pseudoheader(saddr: &Ipv6Addr, daddr: &Ipv6Addr, len: u32, proto: u8) -> [u8; 40] {
    let mut pseudo = [0u8; 40];
    pseudo[..16].copy_from_slice(&saddr.octets());
    pseudo[16..32].copy_from_slice(&daddr.octets());
    pseudo[32..36].copy_from_slice(&len.to_be_bytes());
    pseudo[39] = proto;
    pseudo
}

fn ipv4_pseudoheader(saddr: Ipv4Addr, daddr: Ipv4Addr, len: u16, proto: u8) -> [u8; 12] {
    let mut pseudo = [0u8; 12];
    pseudo[..4].copy_from_slice(&saddr.octets());
    pseudo[4..8].copy_from_slice(&daddr.octets());
    pseudo[9] = proto;
    pseudo[10..12].copy_from_slice(&len.to_be_bytes());
    pseudo
}

/// Fold the IPv6 pseudo-header into a transport checksum.
#[must_use]
pub fn add_ipv6_pseudoheader(
    csum: u16,
    saddr: &Ipv6Addr,
    daddr: &Ipv6Addr,
    len: u32,
    proto: u8,
) -> u16 {
    add_block(csum, &ipv6_pseudoheader(saddr, daddr, len, proto))
}

/// Fold the IPv6 pseudo-header out of a transport checksum.
#[must_use]
pub fn remove_ipv6_pseudoheader(
    csum: u16,
    saddr: &Ipv6Addr,
    daddr: &Ipv6Addr,
    len: u32,
    proto: u8,
) -> u16 {
    remove_block(csum, &ipv6_pseudoheader(saddr, daddr, len, proto))
}

/// Fold the IPv4 pseudo-header into a transport checksum.
#[must_use]
pub fn add_ipv4_pseudoheader(csum: u16, saddr: Ipv4Addr, daddr: Ipv4Addr, len: u16, proto: u8) -> u16 {
    add_block(csum, &ipv4_pseudoheader(saddr, daddr, len, proto))
}

/// Fold the IPv4 pseudo-header out of a transport checksum.
#[must_use]
pub fn remove_ipv4_pseudoheader(
    csum: u16,
    saddr: Ipv4Addr,
    daddr: Ipv4Addr,
    len: u16,
    proto: u8,
) -> u16 {
    remove_block(csum, &ipv4_pseudoheader(saddr, daddr, len, proto))
}
