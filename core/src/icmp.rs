// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! ICMP type/code translation (RFC 6145 sections 4.2 and 5.2).
//!
//! These are pure mappings over the ICMP(v6) type, code and rest-of-header
//! word; the callers in [`crate::xlate`] handle the embedded packet and the
//! checksum consequences.  A `None` result means the message has no
//! counterpart in the other family and the packet is silently dropped.

/// Difference between the IPv4 and IPv6 fixed header sizes.
const HDR_DELTA: u16 = 20;

/// Parameter-problem pointer translation, v6 index to v4 value.
///
/// Indices past the end of the table, and entries of -1, have no v4
/// counterpart.
const PTR6_4: [i8; 41] = [
    0, 1, -1, -1, 2, 2, 9, 8, //
    12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, //
    16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 16, //
    -1,
];

/// Parameter-problem pointer translation, v4 index to v6 value.
const PTR4_6: [i8; 21] = [
    0, 1, 4, 4, -1, -1, -1, -1, 7, 6, -1, -1, 8, 8, 8, 8, 24, 24, 24, 24, -1,
];

/// A translated ICMP header front: type, code and the rest-of-header word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IcmpFront {
    /// The translated type.
    pub icmp_type: u8,
    /// The translated code.
    pub code: u8,
    /// The translated rest-of-header bytes (bytes 4..8 of the message).
    pub rest: [u8; 4],
}

/// Map an ICMPv6 message front to its ICMPv4 counterpart.
///
/// Echo id and other rest-of-header content is carried through except where
/// the target format redefines it (packet-too-big MTU, parameter-problem
/// pointer).
#[must_use]
pub fn icmp6_to_icmp4(icmp_type: u8, code: u8, rest: [u8; 4]) -> Option<IcmpFront> {
    match (icmp_type, code) {
        (128, _) => Some(IcmpFront {
            icmp_type: 8,
            code,
            rest,
        }),
        (129, _) => Some(IcmpFront {
            icmp_type: 0,
            code,
            rest,
        }),
        // Destination unreachable
        (1, 0 | 2 | 3) => Some(IcmpFront {
            icmp_type: 3,
            code: 1,
            rest,
        }),
        (1, 1) => Some(IcmpFront {
            icmp_type: 3,
            code: 10,
            rest,
        }),
        (1, 4) => Some(IcmpFront {
            icmp_type: 3,
            code: 3,
            rest,
        }),
        // Packet too big: the v4 next-hop MTU lives in the low 16 bits and
        // accounts for the smaller v4 header
        (2, _) => {
            let mut rest = rest;
            let mtu = u16::from_be_bytes([rest[2], rest[3]]);
            if mtu > HDR_DELTA {
                rest[2..4].copy_from_slice(&(mtu - HDR_DELTA).to_be_bytes());
            }
            Some(IcmpFront {
                icmp_type: 3,
                code: 4,
                rest,
            })
        }
        // Time exceeded keeps its code
        (3, _) => Some(IcmpFront {
            icmp_type: 11,
            code,
            rest,
        }),
        // Parameter problem: unrecognized next header becomes protocol
        // unreachable; erroneous field needs a translatable pointer
        (4, 1) => Some(IcmpFront {
            icmp_type: 3,
            code: 2,
            rest,
        }),
        (4, 0) => {
            let pointer = u32::from_be_bytes(rest);
            let mapped = usize::try_from(pointer)
                .ok()
                .and_then(|p| PTR6_4.get(p))
                .copied()
                .filter(|&p| p >= 0)?;
            #[allow(clippy::cast_sign_loss)] // filtered non-negative
            Some(IcmpFront {
                icmp_type: 12,
                code: 0,
                rest: [mapped as u8, 0, 0, 0],
            })
        }
        _ => None,
    }
}

/// Map an ICMPv4 message front to its ICMPv6 counterpart.
#[must_use]
pub fn icmp4_to_icmp6(icmp_type: u8, code: u8, rest: [u8; 4]) -> Option<IcmpFront> {
    match (icmp_type, code) {
        (8, _) => Some(IcmpFront {
            icmp_type: 128,
            code,
            rest,
        }),
        (0, _) => Some(IcmpFront {
            icmp_type: 129,
            code,
            rest,
        }),
        // Destination unreachable
        (3, 0 | 1 | 5 | 6 | 7 | 8 | 11 | 12) => Some(IcmpFront {
            icmp_type: 1,
            code: 0,
            rest,
        }),
        // Protocol unreachable: parameter problem pointing at next header
        (3, 2) => Some(IcmpFront {
            icmp_type: 4,
            code: 1,
            rest: 6u32.to_be_bytes(),
        }),
        (3, 3) => Some(IcmpFront {
            icmp_type: 1,
            code: 4,
            rest,
        }),
        // Fragmentation needed: packet too big, MTU raised so v6 hosts
        // fall back to fragment headers rather than ignoring the message
        (3, 4) => {
            let mtu = u16::from_be_bytes([rest[2], rest[3]]);
            let mtu = u32::from(mtu).max(1280);
            Some(IcmpFront {
                icmp_type: 2,
                code: 0,
                rest: mtu.to_be_bytes(),
            })
        }
        (3, 9 | 10 | 13 | 15) => Some(IcmpFront {
            icmp_type: 1,
            code: 1,
            rest,
        }),
        // Time exceeded keeps its code
        (11, _) => Some(IcmpFront {
            icmp_type: 3,
            code,
            rest,
        }),
        // Parameter problem: pointer-at-error and bad-length both need a
        // translatable pointer
        (12, 0 | 2) => {
            let mapped = PTR4_6
                .get(usize::from(rest[0]))
                .copied()
                .filter(|&p| p >= 0)?;
            #[allow(clippy::cast_sign_loss)] // filtered non-negative
            Some(IcmpFront {
                icmp_type: 4,
                code: 0,
                rest: u32::from(mapped as u8).to_be_bytes(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::{IcmpFront, icmp4_to_icmp6, icmp6_to_icmp4};

    #[test]
    fn echo_carries_identifier() {
        let id = [0x12, 0x34, 0x00, 0x07];
        assert_eq!(
            icmp6_to_icmp4(128, 0, id),
            Some(IcmpFront {
                icmp_type: 8,
                code: 0,
                rest: id
            })
        );
        assert_eq!(
            icmp4_to_icmp6(0, 0, id),
            Some(IcmpFront {
                icmp_type: 129,
                code: 0,
                rest: id
            })
        );
    }

    #[test]
    fn dest_unreach_code_map_v6_to_v4() {
        let rest = [0u8; 4];
        for (code, want) in [(0u8, 1u8), (2, 1), (3, 1), (1, 10), (4, 3)] {
            let front = icmp6_to_icmp4(1, code, rest);
            assert_eq!(front.map(|f| (f.icmp_type, f.code)), Some((3, want)));
        }
        assert_eq!(icmp6_to_icmp4(1, 5, rest), None);
    }

    #[test]
    fn packet_too_big_adjusts_mtu() {
        let front = icmp6_to_icmp4(2, 0, 1500u32.to_be_bytes());
        assert_eq!(
            front,
            Some(IcmpFront {
                icmp_type: 3,
                code: 4,
                rest: [0, 0, 0x05, 0xc8] // 1480
            })
        );
        // tiny MTU left alone
        let front = icmp6_to_icmp4(2, 0, 8u32.to_be_bytes());
        assert_eq!(front.map(|f| f.rest), Some([0, 0, 0, 8]));
    }

    #[test]
    fn frag_needed_raises_mtu_floor() {
        let front = icmp4_to_icmp6(3, 4, [0, 0, 0x02, 0x00]); // 512
        assert_eq!(front.map(|f| f.rest), Some(1280u32.to_be_bytes()));
        let front = icmp4_to_icmp6(3, 4, [0, 0, 0x05, 0xdc]); // 1500
        assert_eq!(front.map(|f| f.rest), Some(1500u32.to_be_bytes()));
    }

    #[test]
    fn protocol_unreachable_becomes_param_problem() {
        let front = icmp4_to_icmp6(3, 2, [0u8; 4]);
        assert_eq!(
            front,
            Some(IcmpFront {
                icmp_type: 4,
                code: 1,
                rest: [0, 0, 0, 6]
            })
        );
    }

    #[test]
    fn param_problem_pointer_tables() {
        // v6 pointer 7 (hop limit) -> v4 pointer 8 (ttl)
        let front = icmp6_to_icmp4(4, 0, 7u32.to_be_bytes());
        assert_eq!(front.map(|f| (f.icmp_type, f.code, f.rest)), Some((12, 0, [8, 0, 0, 0])));
        // v6 pointers 2, 3 and >= 41 have no v4 counterpart
        assert_eq!(icmp6_to_icmp4(4, 0, 2u32.to_be_bytes()), None);
        assert_eq!(icmp6_to_icmp4(4, 0, 41u32.to_be_bytes()), None);

        // v4 pointer 9 (protocol) -> v6 pointer 6 (next header)
        let front = icmp4_to_icmp6(12, 0, [9, 0, 0, 0]);
        assert_eq!(
            front.map(|f| (f.icmp_type, f.code, f.rest)),
            Some((4, 0, 6u32.to_be_bytes()))
        );
        // identification has no v6 counterpart
        assert_eq!(icmp4_to_icmp6(12, 0, [4, 0, 0, 0]), None);
        assert_eq!(icmp4_to_icmp6(12, 2, [16, 0, 0, 0]).map(|f| f.rest), Some(24u32.to_be_bytes()));
        // missing-required-option drops
        assert_eq!(icmp4_to_icmp6(12, 1, [0, 0, 0, 0]), None);
    }

    #[test]
    fn time_exceeded_keeps_code() {
        assert_eq!(
            icmp6_to_icmp4(3, 1, [0; 4]).map(|f| (f.icmp_type, f.code)),
            Some((11, 1))
        );
        assert_eq!(
            icmp4_to_icmp6(11, 0, [0; 4]).map(|f| (f.icmp_type, f.code)),
            Some((3, 0))
        );
    }

    #[test]
    fn unknown_types_drop() {
        assert_eq!(icmp6_to_icmp4(130, 0, [0; 4]), None); // MLD
        assert_eq!(icmp4_to_icmp6(13, 0, [0; 4]), None); // timestamp
        assert_eq!(icmp4_to_icmp6(5, 0, [0; 4]), None); // redirect
    }
}
