// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RFC 6052 / MAP-T address codec.
//!
//! Pure functions translating between an IPv4 address (plus, for MAP, a
//! transport port carrying PSID bits) and an IPv6 address under one rule.
//! `None` means the rule does not cover the address; the caller tries the
//! next pair or drops.

use crate::bitcopy::copy_bits;
use crate::rule::{XlateRule, XlateStyle};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Encode an IPv4 address (and optional port) into the rule's IPv6 domain.
///
/// - `None` style: succeeds only for the exact configured /32 ↔ /128 pair.
/// - `Rfc6052`: always succeeds (any v4 address is representable).
/// - `Map`/`Map0`: fails when the address is outside the v4 domain, when the
///   EA-bits cannot cover the host bits, or when PSID bits are required but
///   no port was supplied.
#[must_use]
pub fn encode_v4_to_v6(rule: &XlateRule, v4: Ipv4Addr, port: Option<u16>) -> Option<Ipv6Addr> {
    match rule.style {
        XlateStyle::None => {
            if rule.v6_prefix.prefix_len() == 128
                && rule.v4_prefix.prefix_len() == 32
                && rule.v4_prefix.addr() == v4
            {
                Some(rule.v6_prefix.addr())
            } else {
                None
            }
        }
        XlateStyle::Rfc6052 => encode_rfc6052(rule, v4),
        XlateStyle::Map | XlateStyle::Map0 => encode_map(rule, v4, port),
    }
}

/// Decode an IPv6 address from the rule's domain back to its IPv4 address.
///
/// The PSID portion of the port is deliberately not validated here; port
/// correctness belongs to downstream NAT44 logic.
#[must_use]
pub fn decode_v6_to_v4(rule: &XlateRule, v6: Ipv6Addr) -> Option<Ipv4Addr> {
    match rule.style {
        XlateStyle::None => {
            if rule.v6_prefix.prefix_len() == 128
                && rule.v4_prefix.prefix_len() == 32
                && rule.v6_prefix.addr() == v6
            {
                Some(rule.v4_prefix.addr())
            } else {
                None
            }
        }
        XlateStyle::Rfc6052 => decode_rfc6052(rule, v6),
        XlateStyle::Map | XlateStyle::Map0 => decode_map(rule, v6),
    }
}

// RFC 6052 section 2.2: the v4 bits sit at a fixed position determined by
// the prefix length, skipping the reserved "u" byte (byte 8).
fn encode_rfc6052(rule: &XlateRule, v4: Ipv4Addr) -> Option<Ipv6Addr> {
    let prefix = rule.v6_prefix.network().octets();
    let v4 = v4.octets();
    let mut v6 = [0u8; 16];
    match rule.v6_prefix.prefix_len() {
        32 => {
            v6[..4].copy_from_slice(&prefix[..4]);
            v6[4..8].copy_from_slice(&v4);
        }
        40 => {
            v6[..5].copy_from_slice(&prefix[..5]);
            v6[5..8].copy_from_slice(&v4[..3]);
            v6[9] = v4[3];
        }
        48 => {
            v6[..6].copy_from_slice(&prefix[..6]);
            v6[6] = v4[0];
            v6[7] = v4[1];
            v6[9] = v4[2];
            v6[10] = v4[3];
        }
        56 => {
            v6[..7].copy_from_slice(&prefix[..7]);
            v6[7] = v4[0];
            v6[9] = v4[1];
            v6[10] = v4[2];
            v6[11] = v4[3];
        }
        64 => {
            v6[..8].copy_from_slice(&prefix[..8]);
            v6[9..13].copy_from_slice(&v4);
        }
        96 => {
            v6[..12].copy_from_slice(&prefix[..12]);
            v6[12..16].copy_from_slice(&v4);
        }
        _ => return None,
    }
    Some(Ipv6Addr::from(v6))
}

fn decode_rfc6052(rule: &XlateRule, v6: Ipv6Addr) -> Option<Ipv4Addr> {
    if !rule.v6_prefix.contains(&v6) {
        return None;
    }
    let v6 = v6.octets();
    let v4 = match rule.v6_prefix.prefix_len() {
        32 => [v6[4], v6[5], v6[6], v6[7]],
        40 => [v6[5], v6[6], v6[7], v6[9]],
        48 => [v6[6], v6[7], v6[9], v6[10]],
        56 => [v6[7], v6[9], v6[10], v6[11]],
        64 => [v6[9], v6[10], v6[11], v6[12]],
        96 => [v6[12], v6[13], v6[14], v6[15]],
        _ => return None,
    };
    Some(Ipv4Addr::from(v4))
}

// Extract the PSID: `psid_len` bits of the port starting `psid_offset` bits
// from the MSB.
fn psid_of(port: u16, psid_offset: u8, psid_len: u8) -> u16 {
    if psid_len == 0 {
        return 0;
    }
    (port >> (16 - psid_len - psid_offset)) & (0xffff >> (16 - psid_len))
}

fn encode_map(rule: &XlateRule, v4: Ipv4Addr, port: Option<u16>) -> Option<Ipv6Addr> {
    let host_bits = 32 - rule.v4_prefix.prefix_len();
    if !rule.v4_prefix.contains(&v4) {
        return None;
    }
    if rule.ea_len < host_bits {
        return None;
    }
    let psid_len = rule.psid_len();
    if psid_len > 0 && port.is_none() {
        return None;
    }
    let port = port.unwrap_or(0);
    let psid = psid_of(port, rule.psid_offset, psid_len);

    let v4_octets = v4.octets();
    let mut v6 = [0u8; 16];

    // Interface identifier, before the EA-bits overlay
    match rule.style {
        XlateStyle::Map => {
            // latest draft layout: | 0 (16) | v4 (32) | PSID (16) |
            v6[10..14].copy_from_slice(&v4_octets);
            v6[14..16].copy_from_slice(&psid.to_be_bytes());
        }
        XlateStyle::Map0 => {
            // draft-00 layout: | u (8) | v4 (32) | PSID (16) | 0 (8) |
            v6[9..13].copy_from_slice(&v4_octets);
            v6[13..15].copy_from_slice(&psid.to_be_bytes());
        }
        XlateStyle::None | XlateStyle::Rfc6052 => unreachable!(),
    }

    let prefix_len = usize::from(rule.v6_prefix.prefix_len());
    copy_bits(&rule.v6_prefix.network().octets(), 0, prefix_len, &mut v6, 0);
    if host_bits > 0 {
        copy_bits(
            &v4_octets,
            usize::from(rule.v4_prefix.prefix_len()),
            usize::from(host_bits),
            &mut v6,
            prefix_len,
        );
    }
    if psid_len > 0 {
        copy_bits(
            &port.to_be_bytes(),
            usize::from(rule.psid_offset),
            usize::from(psid_len),
            &mut v6,
            prefix_len + usize::from(host_bits),
        );
    }
    Some(Ipv6Addr::from(v6))
}

fn decode_map(rule: &XlateRule, v6: Ipv6Addr) -> Option<Ipv4Addr> {
    if !rule.v6_prefix.contains(&v6) {
        return None;
    }
    let host_bits = 32 - rule.v4_prefix.prefix_len();
    if rule.ea_len < host_bits {
        return None;
    }
    let mut v4 = rule.v4_prefix.network().octets();
    if host_bits > 0 {
        copy_bits(
            &v6.octets(),
            usize::from(rule.v6_prefix.prefix_len()),
            usize::from(host_bits),
            &mut v4,
            usize::from(rule.v4_prefix.prefix_len()),
        );
    }
    Some(Ipv4Addr::from(v4))
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::{decode_v6_to_v4, encode_v4_to_v6};
    use crate::rule::{XlateRule, XlateStyle};
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn rfc6052_rule(prefix_len: u8) -> XlateRule {
        XlateRule {
            style: XlateStyle::Rfc6052,
            v6_prefix: format!("2001:db8::/{prefix_len}").parse().unwrap(),
            ..XlateRule::default()
        }
    }

    #[test]
    fn rfc6052_round_trip_all_prefix_lengths() {
        bolero::check!().with_type().for_each(|raw: &u32| {
            let v4 = Ipv4Addr::from(*raw);
            for prefix_len in [32u8, 40, 48, 56, 64, 96] {
                let rule = rfc6052_rule(prefix_len);
                let v6 = encode_v4_to_v6(&rule, v4, None).unwrap();
                // the "u" byte stays zero
                assert_eq!(v6.octets()[8], 0);
                assert_eq!(decode_v6_to_v4(&rule, v6), Some(v4), "/{prefix_len}");
            }
        });
    }

    #[test]
    fn rfc6052_slash_32_literal() {
        let rule = rfc6052_rule(32);
        let v6 = encode_v4_to_v6(&rule, Ipv4Addr::new(192, 0, 2, 1), None).unwrap();
        assert_eq!(v6, "2001:db8:c000:201::".parse::<Ipv6Addr>().unwrap());
        assert_eq!(
            decode_v6_to_v4(&rule, "2001:db8:c000:201::".parse().unwrap()),
            Some(Ipv4Addr::new(192, 0, 2, 1))
        );
        // outside the prefix
        assert_eq!(
            decode_v6_to_v4(&rule, "2001:db9:c000:201::".parse().unwrap()),
            None
        );
    }

    fn map_rule(style: XlateStyle) -> XlateRule {
        XlateRule {
            style,
            v4_prefix: "192.0.2.0/24".parse().unwrap(),
            v6_prefix: "2001:db8::/40".parse().unwrap(),
            ea_len: 16,
            psid_offset: 6,
        }
    }

    #[test]
    fn map_literal_layout() {
        // ea-len 16 over a /24 leaves 8 PSID bits; port 0x1840 at offset 6
        // carries PSID 0x10.
        let rule = map_rule(XlateStyle::Map);
        let v6 = encode_v4_to_v6(&rule, Ipv4Addr::new(192, 0, 2, 5), Some(0x1840)).unwrap();
        assert_eq!(
            v6,
            "2001:db8:5:1000:0:c000:205:10".parse::<Ipv6Addr>().unwrap()
        );
        assert_eq!(
            decode_v6_to_v4(&rule, v6),
            Some(Ipv4Addr::new(192, 0, 2, 5))
        );
    }

    #[test]
    fn map0_literal_layout() {
        let rule = map_rule(XlateStyle::Map0);
        let v6 = encode_v4_to_v6(&rule, Ipv4Addr::new(192, 0, 2, 5), Some(0x1840)).unwrap();
        let octets = v6.octets();
        // legacy IID: v4 at bytes 9..13, PSID at 13..15, byte 15 zero
        assert_eq!(&octets[9..13], &[192, 0, 2, 5]);
        assert_eq!(&octets[13..15], &[0x00, 0x10]);
        assert_eq!(octets[15], 0);
        assert_eq!(
            decode_v6_to_v4(&rule, v6),
            Some(Ipv4Addr::new(192, 0, 2, 5))
        );
    }

    #[test]
    fn map_round_trip() {
        bolero::check!()
            .with_type()
            .for_each(|(host, port): &(u8, u16)| {
                let rule = map_rule(XlateStyle::Map);
                let v4 = Ipv4Addr::new(192, 0, 2, *host);
                let v6 = encode_v4_to_v6(&rule, v4, Some(*port)).unwrap();
                assert_eq!(decode_v6_to_v4(&rule, v6), Some(v4));
            });
    }

    #[test]
    fn map_requires_port_when_psid_in_play() {
        let rule = map_rule(XlateStyle::Map);
        assert_eq!(encode_v4_to_v6(&rule, Ipv4Addr::new(192, 0, 2, 5), None), None);
        // outside the v4 domain
        assert_eq!(
            encode_v4_to_v6(&rule, Ipv4Addr::new(192, 0, 3, 5), Some(0x1840)),
            None
        );
        // no PSID bits: port not needed
        let wide = XlateRule {
            ea_len: 8,
            ..map_rule(XlateStyle::Map)
        };
        assert!(encode_v4_to_v6(&wide, Ipv4Addr::new(192, 0, 2, 5), None).is_some());
    }

    #[test]
    fn none_style_exact_host_match_only() {
        let rule = XlateRule {
            style: XlateStyle::None,
            v4_prefix: "192.0.2.1/32".parse().unwrap(),
            v6_prefix: "2001:db8::1/128".parse().unwrap(),
            ..XlateRule::default()
        };
        assert_eq!(
            encode_v4_to_v6(&rule, Ipv4Addr::new(192, 0, 2, 1), None),
            Some("2001:db8::1".parse().unwrap())
        );
        assert_eq!(encode_v4_to_v6(&rule, Ipv4Addr::new(192, 0, 2, 2), None), None);
        assert_eq!(
            decode_v6_to_v4(&rule, "2001:db8::1".parse().unwrap()),
            Some(Ipv4Addr::new(192, 0, 2, 1))
        );
        assert_eq!(decode_v6_to_v4(&rule, "2001:db8::2".parse().unwrap()), None);
    }
}
