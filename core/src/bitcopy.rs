// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Unaligned bit-range copy.
//!
//! The MAP address codec packs prefixes, embedded-address bits and PSIDs at
//! arbitrary bit offsets inside a 128-bit address.  [`copy_bits`] is the one
//! primitive everything is built on: it moves a run of bits between two byte
//! slices without disturbing destination bits outside the written range.
//! Bit 0 is the most significant bit of byte 0.

/// Copy `len_bits` bits from `src` (starting at `src_bit_offset`) into `dst`
/// (starting at `dst_bit_offset`).
///
/// Destination bits outside `[dst_bit_offset, dst_bit_offset + len_bits)`
/// are left untouched.  A zero-length copy is a no-op.
///
/// # Panics
///
/// Panics if either bit range runs past the end of its slice.
pub fn copy_bits(
    src: &[u8],
    src_bit_offset: usize,
    len_bits: usize,
    dst: &mut [u8],
    dst_bit_offset: usize,
) {
    if len_bits == 0 {
        return;
    }
    assert!(src_bit_offset + len_bits <= src.len() * 8);
    assert!(dst_bit_offset + len_bits <= dst.len() * 8);

    // Fast path: both runs are byte aligned
    if src_bit_offset % 8 == 0 && dst_bit_offset % 8 == 0 && len_bits % 8 == 0 {
        let src_byte = src_bit_offset / 8;
        let dst_byte = dst_bit_offset / 8;
        let len = len_bits / 8;
        dst[dst_byte..dst_byte + len].copy_from_slice(&src[src_byte..src_byte + len]);
        return;
    }

    // General path: one bit at a time.  The domain is at most 128 bits, so
    // this is never hot enough to warrant the skew-shifting variant.
    for i in 0..len_bits {
        let s = src_bit_offset + i;
        let bit = (src[s / 8] >> (7 - s % 8)) & 1;
        let d = dst_bit_offset + i;
        let mask = 1u8 << (7 - d % 8);
        if bit == 0 {
            dst[d / 8] &= !mask;
        } else {
            dst[d / 8] |= mask;
        }
    }
}

/// Read `len_bits` bits (at most 16) from `src` starting at `bit_offset`,
/// right-aligned into a `u16`.
#[must_use]
pub fn extract_bits16(src: &[u8], bit_offset: usize, len_bits: usize) -> u16 {
    debug_assert!(len_bits <= 16);
    let mut out = [0u8; 2];
    copy_bits(src, bit_offset, len_bits, &mut out, 16 - len_bits);
    u16::from_be_bytes(out)
}
