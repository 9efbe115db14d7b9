// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The two translation paths.
//!
//! Both paths work the same way: parse and classify the packet, resolve the
//! new addresses against the rule table, patch the transport checksum for
//! the pseudo-header swap, then reshape the buffer in place and write the
//! new network header over the front.  ICMP error messages additionally get
//! the packet embedded in their payload translated, which moves the bytes
//! after the embedded IP header by the header-size delta.

pub(crate) mod v4to6;
pub(crate) mod v6to4;

/// Byte offset of the checksum within a TCP header.
pub(crate) const TCP_CSUM_OFFSET: usize = 16;
/// Byte offset of the checksum within a UDP header.
pub(crate) const UDP_CSUM_OFFSET: usize = 6;
/// Byte offset of the checksum within an ICMP(v6) header.
pub(crate) const ICMP_CSUM_OFFSET: usize = 2;

/// Fold a 32-bit IPv6 fragment identification into the 16-bit IPv4
/// identification field by xoring the halves.
pub(crate) fn fold_frag_id(id: u32) -> u16 {
    #[allow(clippy::cast_possible_truncation)] // masked
    {
        ((id >> 16) as u16) ^ ((id & 0xffff) as u16)
    }
}

/// Read a big-endian 16-bit word at `at`.
pub(crate) fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Write a big-endian 16-bit word at `at`.
pub(crate) fn write_u16(bytes: &mut [u8], at: usize, value: u16) {
    bytes[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod test {
    use super::fold_frag_id;

    #[test]
    fn frag_id_folds_both_halves() {
        assert_eq!(fold_frag_id(0x0000_1234), 0x1234);
        assert_eq!(fold_frag_id(0xabcd_0000), 0xabcd);
        assert_eq!(fold_frag_id(0xffff_ffff), 0);
    }
}
