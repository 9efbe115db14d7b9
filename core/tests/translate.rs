// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! End-to-end packet translation scenarios.

#![allow(clippy::unwrap_used)] // valid in tests

use etherparse::{IpNumber, Ipv4Header, Ipv6Header, PacketBuilder};
use nat46_core::checksum::{add_block, add_ipv4_pseudoheader, add_ipv6_pseudoheader};
use nat46_core::{
    DropReason, FragmentReassembler, Nat46, NullReassembler, ReassemblyOutcome, RulePair,
    TranslationError, Verdict, XlateRule, XlateStyle,
};
use net::buffer::{Prepend, TestBuffer};
use rand::Rng;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing_test::traced_test;

const V4_LOCAL: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
const V4_REMOTE: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

fn v6(addr: &str) -> Ipv6Addr {
    addr.parse().unwrap()
}

/// A plain NAT64-style setup: the local side embeds v4 addresses under
/// 2001:db8::/32, the remote side under the well-known 64:ff9b::/96.
fn rfc6052_engine() -> Nat46 {
    let nat46 = Nat46::new();
    nat46
        .add_pair(RulePair {
            local: XlateRule {
                style: XlateStyle::Rfc6052,
                v6_prefix: "2001:db8::/32".parse().unwrap(),
                v4_prefix: "0.0.0.0/0".parse().unwrap(),
                ..XlateRule::default()
            },
            remote: XlateRule {
                style: XlateStyle::Rfc6052,
                v6_prefix: "64:ff9b::/96".parse().unwrap(),
                v4_prefix: "0.0.0.0/0".parse().unwrap(),
                ..XlateRule::default()
            },
        })
        .unwrap();
    nat46
}

/// A MAP-T CE setup: the local domain 192.0.2.0/24 shares addresses via
/// 8 PSID bits at offset 6; the remote side is an RFC 6052 default route.
fn map_engine() -> Nat46 {
    let nat46 = Nat46::new();
    nat46
        .add_pair(RulePair {
            local: XlateRule {
                style: XlateStyle::Map,
                v6_prefix: "2001:db8::/40".parse().unwrap(),
                v4_prefix: "192.0.2.0/24".parse().unwrap(),
                ea_len: 16,
                psid_offset: 6,
            },
            remote: XlateRule {
                style: XlateStyle::Rfc6052,
                v6_prefix: "64:ff9b::/96".parse().unwrap(),
                v4_prefix: "0.0.0.0/0".parse().unwrap(),
                ..XlateRule::default()
            },
        })
        .unwrap();
    nat46
}

fn v4_udp(src: Ipv4Addr, dst: Ipv4Addr, sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    PacketBuilder::ipv4(src.octets(), dst.octets(), 64)
        .udp(sport, dport)
        .write(&mut bytes, payload)
        .unwrap();
    bytes
}

fn v6_udp(src: &Ipv6Addr, dst: &Ipv6Addr, sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    PacketBuilder::ipv6(src.octets(), dst.octets(), 64)
        .udp(sport, dport)
        .write(&mut bytes, payload)
        .unwrap();
    bytes
}

fn v4_packet(src: Ipv4Addr, dst: Ipv4Addr, proto: IpNumber, payload: &[u8]) -> Vec<u8> {
    let mut ip = Ipv4Header::new(
        u16::try_from(payload.len()).unwrap(),
        64,
        proto,
        src.octets(),
        dst.octets(),
    )
    .unwrap();
    ip.header_checksum = ip.calc_header_checksum();
    let mut bytes = ip.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

fn v6_packet(src: &Ipv6Addr, dst: &Ipv6Addr, next: IpNumber, payload: &[u8]) -> Vec<u8> {
    let ip = Ipv6Header {
        payload_length: u16::try_from(payload.len()).unwrap(),
        next_header: next,
        hop_limit: 64,
        source: src.octets(),
        destination: dst.octets(),
        ..Default::default()
    };
    let mut bytes = ip.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

// Fill in the checksum of an ICMPv4 message whose checksum field is zero.
fn finish_icmp4(mut msg: Vec<u8>) -> Vec<u8> {
    let csum = add_block(0xffff, &msg);
    msg[2..4].copy_from_slice(&csum.to_be_bytes());
    msg
}

// Fill in the checksum of an ICMPv6 message whose checksum field is zero.
fn finish_icmp6(mut msg: Vec<u8>, src: &Ipv6Addr, dst: &Ipv6Addr) -> Vec<u8> {
    let len = u32::try_from(msg.len()).unwrap();
    let csum = add_ipv6_pseudoheader(add_block(0xffff, &msg), src, dst, len, 58);
    msg[2..4].copy_from_slice(&csum.to_be_bytes());
    msg
}

// A valid internet checksum sums (with its pseudo-header, if any) to zero.
fn assert_icmp4_checksum_ok(msg: &[u8]) {
    assert_eq!(add_block(0xffff, msg), 0, "ICMPv4 checksum invalid");
}

fn assert_icmp6_checksum_ok(msg: &[u8], src: &Ipv6Addr, dst: &Ipv6Addr) {
    let len = u32::try_from(msg.len()).unwrap();
    assert_eq!(
        add_ipv6_pseudoheader(add_block(0xffff, msg), src, dst, len, 58),
        0,
        "ICMPv6 checksum invalid"
    );
}

fn assert_udp6_checksum_ok(udp: &[u8], src: &Ipv6Addr, dst: &Ipv6Addr) {
    let len = u32::try_from(udp.len()).unwrap();
    assert_eq!(
        add_ipv6_pseudoheader(add_block(0xffff, udp), src, dst, len, 17),
        0,
        "UDP/IPv6 checksum invalid"
    );
}

fn assert_udp4_checksum_ok(udp: &[u8], src: Ipv4Addr, dst: Ipv4Addr) {
    let len = u16::try_from(udp.len()).unwrap();
    assert_eq!(
        add_ipv4_pseudoheader(add_block(0xffff, udp), src, dst, len, 17),
        0,
        "UDP/IPv4 checksum invalid"
    );
}

#[test]
fn udp_v4_to_v6_matches_native_packet() {
    let nat46 = rfc6052_engine();
    let mut buf = TestBuffer::from_raw_data(&v4_udp(V4_LOCAL, V4_REMOTE, 4242, 53, &[1, 2, 3, 4]));
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));

    // byte-for-byte what a native v6 host would have sent
    let expected = v6_udp(
        &v6("2001:db8:c000:201::"),
        &v6("64:ff9b::808:808"),
        4242,
        53,
        &[1, 2, 3, 4],
    );
    assert_eq!(buf.as_ref(), expected.as_slice());
}

#[test]
fn udp_translation_preserves_arbitrary_payloads() {
    let nat46 = rfc6052_engine();
    let mut rng = rand::rng();
    let payload: Vec<u8> = (0..257).map(|_| rng.random()).collect();
    let mut buf = TestBuffer::from_raw_data(&v4_udp(V4_LOCAL, V4_REMOTE, 4242, 53, &payload));
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));
    let expected = v6_udp(
        &v6("2001:db8:c000:201::"),
        &v6("64:ff9b::808:808"),
        4242,
        53,
        &payload,
    );
    assert_eq!(buf.as_ref(), expected.as_slice());
}

#[test]
fn tcp_v6_to_v4_swaps_pseudoheader() {
    let nat46 = rfc6052_engine();
    let mut bytes = Vec::new();
    PacketBuilder::ipv6(
        v6("64:ff9b::808:808").octets(),
        v6("2001:db8:c000:201::").octets(),
        64,
    )
    .tcp(443, 4242, 0x1000, 512)
    .write(&mut bytes, &[0xde, 0xad])
    .unwrap();
    let mut buf = TestBuffer::from_raw_data(&bytes);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Forward)
    );

    let out = buf.as_ref();
    let (ip, rest) = Ipv4Header::from_slice(out).unwrap();
    assert_eq!(Ipv4Addr::from(ip.source), V4_REMOTE);
    assert_eq!(Ipv4Addr::from(ip.destination), V4_LOCAL);
    assert_eq!(ip.protocol, IpNumber::TCP);
    assert_eq!(ip.time_to_live, 64);
    assert!(ip.dont_fragment);
    assert_eq!(ip.header_checksum, ip.calc_header_checksum());

    // the TCP section must match what a native v4 sender would produce
    let mut expected = Vec::new();
    PacketBuilder::ipv4(V4_REMOTE.octets(), V4_LOCAL.octets(), 64)
        .tcp(443, 4242, 0x1000, 512)
        .write(&mut expected, &[0xde, 0xad])
        .unwrap();
    assert_eq!(rest, &expected[20..]);
}

#[test]
fn udp_v6_to_v4_round_trip() {
    let nat46 = rfc6052_engine();
    let original = v4_udp(V4_LOCAL, V4_REMOTE, 4242, 53, b"ping");
    let mut buf = TestBuffer::from_raw_data(&original);
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));

    // swap the addresses as the far end would and translate back
    let reply = v6_udp(
        &v6("64:ff9b::808:808"),
        &v6("2001:db8:c000:201::"),
        53,
        4242,
        b"pong",
    );
    let mut buf = TestBuffer::from_raw_data(&reply);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Forward)
    );
    let out = buf.as_ref();
    let (ip, udp) = Ipv4Header::from_slice(out).unwrap();
    assert_eq!(Ipv4Addr::from(ip.source), V4_REMOTE);
    assert_eq!(Ipv4Addr::from(ip.destination), V4_LOCAL);
    assert_udp4_checksum_ok(udp, V4_REMOTE, V4_LOCAL);
    assert_eq!(&udp[8..], b"pong");
}

#[test]
fn map_encodes_psid_from_source_port() {
    let nat46 = map_engine();
    // port 0x1840 at offset 6 carries PSID 0x10 under ea-len 16 over a /24
    let packet = v4_udp(Ipv4Addr::new(192, 0, 2, 5), V4_REMOTE, 0x1840, 53, &[9]);
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));

    let expected = v6_udp(
        &v6("2001:db8:5:1000:0:c000:205:10"),
        &v6("64:ff9b::808:808"),
        0x1840,
        53,
        &[9],
    );
    assert_eq!(buf.as_ref(), expected.as_slice());
}

#[test]
fn map_decodes_back_to_shared_address() {
    let nat46 = map_engine();
    let reply = v6_udp(
        &v6("64:ff9b::808:808"),
        &v6("2001:db8:5:1000:0:c000:205:10"),
        53,
        0x1840,
        &[9],
    );
    let mut buf = TestBuffer::from_raw_data(&reply);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Forward)
    );
    let (ip, _) = Ipv4Header::from_slice(buf.as_ref()).unwrap();
    assert_eq!(Ipv4Addr::from(ip.source), V4_REMOTE);
    assert_eq!(Ipv4Addr::from(ip.destination), Ipv4Addr::new(192, 0, 2, 5));
}

#[test]
fn echo_request_v4_to_v6() {
    let nat46 = rfc6052_engine();
    let mut msg = vec![8, 0, 0, 0, 0x12, 0x34, 0, 7];
    msg.extend_from_slice(b"abcdefgh");
    let packet = v4_packet(V4_LOCAL, V4_REMOTE, IpNumber::ICMP, &finish_icmp4(msg));
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));

    let out = buf.as_ref();
    let (ip, icmp) = Ipv6Header::from_slice(out).unwrap();
    assert_eq!(ip.next_header, IpNumber::IPV6_ICMP);
    let src = Ipv6Addr::from(ip.source);
    let dst = Ipv6Addr::from(ip.destination);
    assert_eq!(src, v6("2001:db8:c000:201::"));
    assert_eq!(dst, v6("64:ff9b::808:808"));
    assert_eq!(icmp[0], 128);
    assert_eq!(&icmp[4..6], &[0x12, 0x34]); // identifier carried through
    assert_icmp6_checksum_ok(icmp, &src, &dst);
}

#[test]
fn echo_reply_v6_to_v4() {
    let nat46 = rfc6052_engine();
    let src = v6("64:ff9b::808:808");
    let dst = v6("2001:db8:c000:201::");
    let mut msg = vec![129, 0, 0, 0, 0x12, 0x34, 0, 7];
    msg.extend_from_slice(b"abcdefgh");
    let packet = v6_packet(&src, &dst, IpNumber::IPV6_ICMP, &finish_icmp6(msg, &src, &dst));
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Forward)
    );
    let (ip, icmp) = Ipv4Header::from_slice(buf.as_ref()).unwrap();
    assert_eq!(ip.protocol, IpNumber::ICMP);
    assert_eq!(icmp[0], 0);
    assert_eq!(&icmp[4..6], &[0x12, 0x34]);
    assert_icmp4_checksum_ok(icmp);
}

#[test]
fn port_unreachable_v4_to_v6_translates_embedded_packet() {
    let nat46 = map_engine();
    let ce = Ipv4Addr::new(192, 0, 2, 5);
    // the packet that provoked the error flowed remote -> local
    let inner = v4_udp(V4_REMOTE, ce, 53, 0x1840, &[1, 2, 3, 4]);
    let mut msg = vec![3, 3, 0, 0, 0, 0, 0, 0];
    msg.extend_from_slice(&inner);
    let packet = v4_packet(ce, V4_REMOTE, IpNumber::ICMP, &finish_icmp4(msg));
    let old_len = packet.len();
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));

    let out = buf.as_ref();
    // the embedded header grew from 20 to 40 bytes, the outer from 20 to 40
    assert_eq!(out.len(), old_len + 20 + 20);
    let (ip, icmp) = Ipv6Header::from_slice(out).unwrap();
    let src = Ipv6Addr::from(ip.source);
    let dst = Ipv6Addr::from(ip.destination);
    // the outer ports come from the embedded packet, swapped: the CE port
    // 0x1840 selects the PSID of the MAP source address
    assert_eq!(src, v6("2001:db8:5:1000:0:c000:205:10"));
    assert_eq!(dst, v6("64:ff9b::808:808"));
    // port unreachable (3/3) becomes 1/4
    assert_eq!(&icmp[..2], &[1, 4]);
    assert_icmp6_checksum_ok(icmp, &src, &dst);

    let (inner_ip, inner_udp) = Ipv6Header::from_slice(&icmp[8..]).unwrap();
    let inner_src = Ipv6Addr::from(inner_ip.source);
    let inner_dst = Ipv6Addr::from(inner_ip.destination);
    assert_eq!(inner_src, v6("64:ff9b::808:808"));
    assert_eq!(inner_dst, v6("2001:db8:5:1000:0:c000:205:10"));
    assert_eq!(inner_ip.next_header, IpNumber::UDP);
    assert_eq!(&inner_udp[..2], &[0, 53]);
    assert_eq!(&inner_udp[2..4], &[0x18, 0x40]);
    assert_udp6_checksum_ok(inner_udp, &inner_src, &inner_dst);
}

#[test]
fn packet_too_big_v6_to_v4_becomes_frag_needed() {
    let nat46 = rfc6052_engine();
    let src = v6("64:ff9b::808:808");
    let dst = v6("2001:db8:c000:201::");
    // the packet that provoked the error flowed local -> remote
    let inner = v6_udp(&dst, &src, 1234, 53, &[1, 2, 3, 4]);
    let mut msg = vec![2, 0, 0, 0, 0, 0, 0x05, 0xdc]; // MTU 1500
    msg.extend_from_slice(&inner);
    let packet = v6_packet(&src, &dst, IpNumber::IPV6_ICMP, &finish_icmp6(msg, &src, &dst));
    let old_len = packet.len();
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Forward)
    );

    let out = buf.as_ref();
    // both the outer and the embedded header shrank by 20 bytes
    assert_eq!(out.len(), old_len - 20 - 20);
    let (ip, icmp) = Ipv4Header::from_slice(out).unwrap();
    assert_eq!(Ipv4Addr::from(ip.source), V4_REMOTE);
    assert_eq!(Ipv4Addr::from(ip.destination), V4_LOCAL);
    assert_eq!(ip.header_checksum, ip.calc_header_checksum());
    // fragmentation needed, MTU reduced by the header-size delta
    assert_eq!(&icmp[..2], &[3, 4]);
    assert_eq!(&icmp[6..8], &[0x05, 0xc8]); // 1480
    assert_icmp4_checksum_ok(icmp);

    let (inner_ip, inner_udp) = Ipv4Header::from_slice(&icmp[8..]).unwrap();
    assert_eq!(Ipv4Addr::from(inner_ip.source), V4_LOCAL);
    assert_eq!(Ipv4Addr::from(inner_ip.destination), V4_REMOTE);
    assert_eq!(inner_ip.protocol, IpNumber::UDP);
    assert!(inner_ip.dont_fragment);
    assert_udp4_checksum_ok(inner_udp, V4_LOCAL, V4_REMOTE);
}

#[test]
fn atomic_fragment_v6_to_v4_folds_identification() {
    let nat46 = rfc6052_engine();
    let src = v6("64:ff9b::808:808");
    let dst = v6("2001:db8:c000:201::");
    // splice an atomic fragment header into a valid UDP packet
    let native = v6_udp(&src, &dst, 53, 4242, b"data");
    let mut payload = vec![17, 0, 0, 0, 0x00, 0x01, 0x23, 0x45];
    payload.extend_from_slice(&native[40..]);
    let packet = v6_packet(&src, &dst, IpNumber::IPV6_FRAGMENTATION_HEADER, &payload);
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Forward)
    );
    let (ip, udp) = Ipv4Header::from_slice(buf.as_ref()).unwrap();
    // the 32-bit identification folds to 16 bits, DF comes out clear
    assert_eq!(ip.identification, 0x2344);
    assert!(!ip.dont_fragment);
    assert!(!ip.more_fragments);
    assert_udp4_checksum_ok(udp, V4_REMOTE, V4_LOCAL);
}

#[test]
fn v4_fragment_gains_fragment_header() {
    let nat46 = rfc6052_engine();
    // non-first fragment: raw payload bytes, no transport header
    let mut ip = Ipv4Header::new(16, 64, IpNumber::UDP, V4_LOCAL.octets(), V4_REMOTE.octets())
        .unwrap();
    ip.identification = 0x4242;
    ip.more_fragments = true;
    ip.fragment_offset = 185.try_into().unwrap();
    ip.header_checksum = ip.calc_header_checksum();
    let mut packet = ip.to_bytes().to_vec();
    packet.extend_from_slice(&[0xaa; 16]);

    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));
    let out = buf.as_ref();
    let (ip6, rest) = Ipv6Header::from_slice(out).unwrap();
    assert_eq!(ip6.next_header, IpNumber::IPV6_FRAGMENTATION_HEADER);
    assert_eq!(ip6.payload_length, 8 + 16);
    // next header, reserved, offset 185 with MF, identification zero-extended
    assert_eq!(&rest[..8], &[17, 0, 0x05, 0xc9, 0, 0, 0x42, 0x42]);
    assert_eq!(&rest[8..], &[0xaa; 16]);
}

#[test]
fn dummy_fragment_header_advertises_v4_identification() {
    let nat46 = Nat46::with_dummy_fragment_header();
    nat46
        .add_pair(RulePair {
            local: XlateRule {
                style: XlateStyle::Rfc6052,
                v6_prefix: "2001:db8::/32".parse().unwrap(),
                v4_prefix: "0.0.0.0/0".parse().unwrap(),
                ..XlateRule::default()
            },
            remote: XlateRule {
                style: XlateStyle::Rfc6052,
                v6_prefix: "64:ff9b::/96".parse().unwrap(),
                v4_prefix: "0.0.0.0/0".parse().unwrap(),
                ..XlateRule::default()
            },
        })
        .unwrap();

    // the UDP section of a checksummed packet, under a DF-clear header
    let native = v4_udp(V4_LOCAL, V4_REMOTE, 4242, 53, b"hi");
    let payload = native[20..].to_vec();
    let mut ip = Ipv4Header::new(
        u16::try_from(payload.len()).unwrap(),
        64,
        IpNumber::UDP,
        V4_LOCAL.octets(),
        V4_REMOTE.octets(),
    )
    .unwrap();
    ip.identification = 0xbeef;
    ip.dont_fragment = false;
    ip.header_checksum = ip.calc_header_checksum();
    let mut packet = ip.to_bytes().to_vec();
    packet.extend_from_slice(&payload);

    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(nat46.translate_v4_to_v6(&mut buf), Ok(Verdict::Forward));
    let out = buf.as_ref();
    let (ip6, rest) = Ipv6Header::from_slice(out).unwrap();
    assert_eq!(ip6.next_header, IpNumber::IPV6_FRAGMENTATION_HEADER);
    // atomic fragment: offset 0, MF clear, v4 identification zero-extended
    assert_eq!(&rest[..8], &[17, 0, 0, 0, 0, 0, 0xbe, 0xef]);
    let src = Ipv6Addr::from(ip6.source);
    let dst = Ipv6Addr::from(ip6.destination);
    assert_udp6_checksum_ok(&rest[8..], &src, &dst);
}

#[test]
fn fragmented_icmp6_goes_to_the_reassembler() {
    let nat46 = rfc6052_engine();
    let src = v6("64:ff9b::808:808");
    let dst = v6("2001:db8:c000:201::");
    // first fragment of an ICMPv6 message
    let mut payload = vec![58, 0, 0, 1, 0, 0, 0, 9]; // offset 0, MF set
    payload.extend_from_slice(&[128, 0, 0, 0, 0, 1, 0, 1]);
    let fragment = v6_packet(&src, &dst, IpNumber::IPV6_FRAGMENTATION_HEADER, &payload);

    // without reassembly the fragment is dropped
    let mut buf = TestBuffer::from_raw_data(&fragment);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Drop(DropReason::ReassemblyFailed))
    );

    struct Pending;
    impl FragmentReassembler for Pending {
        fn add_fragment(&mut self, _packet: &[u8]) -> ReassemblyOutcome {
            ReassemblyOutcome::Pending
        }
    }
    let mut buf = TestBuffer::from_raw_data(&fragment);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut Pending),
        Ok(Verdict::Absorbed)
    );

    // a completed reassembly is translated in place of the fragment
    struct Precooked(Vec<u8>);
    impl FragmentReassembler for Precooked {
        fn add_fragment(&mut self, _packet: &[u8]) -> ReassemblyOutcome {
            ReassemblyOutcome::Complete(self.0.clone())
        }
    }
    let mut echo = vec![128, 0, 0, 0, 0, 1, 0, 1];
    echo.extend_from_slice(b"payload from both fragments");
    let whole = v6_packet(&src, &dst, IpNumber::IPV6_ICMP, &finish_icmp6(echo, &src, &dst));
    let mut buf = TestBuffer::from_raw_data(&fragment);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut Precooked(whole)),
        Ok(Verdict::Forward)
    );
    let (ip, icmp) = Ipv4Header::from_slice(buf.as_ref()).unwrap();
    assert_eq!(ip.protocol, IpNumber::ICMP);
    assert_eq!(icmp[0], 8);
    assert_icmp4_checksum_ok(icmp);
}

#[test]
#[traced_test]
fn unmatched_addresses_drop() {
    let nat46 = Nat46::new();
    let mut buf = TestBuffer::from_raw_data(&v4_udp(V4_LOCAL, V4_REMOTE, 1, 2, &[0]));
    assert_eq!(
        nat46.translate_v4_to_v6(&mut buf),
        Ok(Verdict::Drop(DropReason::NoMatchingRule))
    );

    let reply = v6_udp(&v6("64:ff9b::1"), &v6("2001:db8::1"), 1, 2, &[0]);
    let mut buf = TestBuffer::from_raw_data(&reply);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Drop(DropReason::NoMatchingRule))
    );
}

#[test]
#[traced_test]
fn untranslatable_icmp_drops() {
    let nat46 = rfc6052_engine();
    let src = v6("64:ff9b::808:808");
    let dst = v6("2001:db8:c000:201::");
    // MLD report: no ICMPv4 counterpart
    let msg = finish_icmp6(vec![131, 0, 0, 0, 0, 0, 0, 0], &src, &dst);
    let mut buf = TestBuffer::from_raw_data(&v6_packet(&src, &dst, IpNumber::IPV6_ICMP, &msg));
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Drop(DropReason::UnsupportedIcmp))
    );

    // timestamp request: no ICMPv6 counterpart
    let msg = finish_icmp4(vec![13, 0, 0, 0, 0, 0, 0, 0]);
    let mut buf = TestBuffer::from_raw_data(&v4_packet(V4_LOCAL, V4_REMOTE, IpNumber::ICMP, &msg));
    assert_eq!(
        nat46.translate_v4_to_v6(&mut buf),
        Ok(Verdict::Drop(DropReason::UnsupportedIcmp))
    );
}

#[test]
fn nested_icmp_error_drops() {
    let nat46 = rfc6052_engine();
    // time exceeded carrying a destination unreachable
    let mut nested = vec![3, 1, 0, 0, 0, 0, 0, 0];
    let inner_err = v4_packet(V4_REMOTE, V4_LOCAL, IpNumber::ICMP, &finish_icmp4(vec![
        3, 1, 0, 0, 0, 0, 0, 0,
    ]));
    nested.extend_from_slice(&inner_err);
    let packet = v4_packet(V4_LOCAL, V4_REMOTE, IpNumber::ICMP, &finish_icmp4(nested));
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(
        nat46.translate_v4_to_v6(&mut buf),
        Ok(Verdict::Drop(DropReason::NestedIcmpError))
    );
}

#[test]
fn fragmented_icmp4_drops() {
    let nat46 = rfc6052_engine();
    let mut ip = Ipv4Header::new(16, 64, IpNumber::ICMP, V4_LOCAL.octets(), V4_REMOTE.octets())
        .unwrap();
    ip.more_fragments = true;
    ip.header_checksum = ip.calc_header_checksum();
    let mut packet = ip.to_bytes().to_vec();
    packet.extend_from_slice(&finish_icmp4(vec![8, 0, 0, 0, 0, 1, 0, 1]));
    packet.extend_from_slice(&[0; 8]);
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(
        nat46.translate_v4_to_v6(&mut buf),
        Ok(Verdict::Drop(DropReason::FragmentedIcmp))
    );
}

#[test]
fn truncated_packets_drop() {
    let nat46 = rfc6052_engine();
    // the v6 payload length field claims more than the buffer holds
    let mut packet = v6_udp(
        &v6("64:ff9b::808:808"),
        &v6("2001:db8:c000:201::"),
        1,
        2,
        &[0; 8],
    );
    packet[4..6].copy_from_slice(&100u16.to_be_bytes());
    let mut buf = TestBuffer::from_raw_data(&packet);
    assert_eq!(
        nat46.translate_v6_to_v4(&mut buf, &mut NullReassembler),
        Ok(Verdict::Drop(DropReason::Malformed))
    );
}

#[test]
fn missing_headroom_reports_buffer_too_small() {
    let nat46 = rfc6052_engine();
    let packet = v4_udp(V4_LOCAL, V4_REMOTE, 4242, 53, &[1, 2, 3, 4]);
    // a buffer with its headroom already spent
    let mut buf = TestBuffer::new();
    buf.prepend(TestBuffer::HEADROOM).unwrap();
    buf.as_mut()[..packet.len()].copy_from_slice(&packet);
    assert_eq!(
        nat46.translate_v4_to_v6(&mut buf),
        Err(TranslationError::BufferTooSmall {
            needed: 20,
            available: 0,
        })
    );
}
