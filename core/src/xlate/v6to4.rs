// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The IPv6 to IPv4 translation path.
//!
//! The IPv6 header (and the fragment extension header, when present) is
//! replaced in place by a freshly built IPv4 header.  Transport checksums
//! are patched incrementally for the pseudo-header swap; ICMPv6 messages get
//! their type/code front remapped, the packet embedded in an error message
//! translated, and their checksum rebuilt from the incremental deltas.
//!
//! Fragmented (non-atomic) ICMPv6 payloads cannot be translated fragment by
//! fragment because the ICMPv6 checksum covers the whole message; those are
//! handed to the caller's [`FragmentReassembler`].

use crate::checksum::{
    add_block, add_ipv4_pseudoheader, remove_block, remove_ipv6_pseudoheader, update16,
};
use crate::codec;
use crate::icmp;
use crate::instance::{
    DropReason, FragmentReassembler, Nat46, ReassemblyOutcome, TranslationError, Verdict,
};
use crate::table::{RuleKind, RuleTable};
use crate::xlate::{
    ICMP_CSUM_OFFSET, TCP_CSUM_OFFSET, UDP_CSUM_OFFSET, fold_frag_id, read_u16, write_u16,
};
use net::buffer::PacketBufferMut;
use net::checksum::Checksum;
use net::headers::{EmbeddedHeaders, EmbeddedIpVersion, EmbeddedTransport, Net};
use net::ip::NextHeader;
use net::ipv4::dscp::Dscp;
use net::ipv4::ecn::Ecn;
use net::ipv4::frag_offset::FragOffset;
use net::ipv4::{Ipv4, UnicastIpv4Addr};
use net::ipv6::{Ipv6, Ipv6Frag};
use net::parse::{DeParse, Parse, ParseWith};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{debug, trace};

enum Step {
    Done(Verdict),
    Reassemble,
}

pub(crate) fn translate<Buf: PacketBufferMut>(
    nat46: &Nat46,
    buf: &mut Buf,
    reasm: &mut impl FragmentReassembler,
) -> Result<Verdict, TranslationError> {
    let mut reassembled = false;
    loop {
        match translate_once(nat46, buf) {
            Step::Done(verdict) => return Ok(verdict),
            // A reassembler that hands back a still-fragmented packet would
            // loop forever; one round is all it gets.
            Step::Reassemble if reassembled => {
                return Ok(Verdict::Drop(DropReason::ReassemblyFailed));
            }
            Step::Reassemble => match reasm.add_fragment(buf.as_ref()) {
                ReassemblyOutcome::Pending => return Ok(Verdict::Absorbed),
                ReassemblyOutcome::Failed => {
                    return Ok(Verdict::Drop(DropReason::ReassemblyFailed));
                }
                ReassemblyOutcome::Complete(packet) => {
                    reload(buf, &packet)?;
                    reassembled = true;
                }
            },
        }
    }
}

// Replace the buffer contents with the reassembled packet.
fn reload<Buf: PacketBufferMut>(buf: &mut Buf, packet: &[u8]) -> Result<(), TranslationError> {
    let have = buf.as_ref().len();
    if packet.len() > have {
        let needed =
            u16::try_from(packet.len() - have).map_err(|_| TranslationError::BufferTooSmall {
                needed: u16::MAX,
                available: buf.tailroom(),
            })?;
        buf.append(needed)
            .map(|_| ())
            .map_err(|e| TranslationError::BufferTooSmall {
                needed: e.requested,
                available: e.available,
            })?;
    } else {
        let trim = u16::try_from(have - packet.len()).unwrap_or_else(|_| unreachable!());
        if trim > 0 {
            buf.trim_from_end(trim)
                .map(|_| ())
                .unwrap_or_else(|_| unreachable!());
        }
    }
    buf.as_mut()[..packet.len()].copy_from_slice(packet);
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn translate_once<Buf: PacketBufferMut>(nat46: &Nat46, buf: &mut Buf) -> Step {
    let Ok((ip6, _)) = Ipv6::parse(buf.as_ref()) else {
        return Step::Done(Verdict::Drop(DropReason::Malformed));
    };
    let total_len = usize::from(Ipv6::MIN_LEN.get()) + usize::from(ip6.payload_length());
    if buf.as_ref().len() < total_len {
        debug!("IPv6 packet shorter than its payload length field");
        return Step::Done(Verdict::Drop(DropReason::Malformed));
    }
    // drop link-layer padding so tail arithmetic below is exact
    let padding = u16::try_from(buf.as_ref().len() - total_len).unwrap_or_else(|_| unreachable!());
    if padding > 0 {
        buf.trim_from_end(padding)
            .map(|_| ())
            .unwrap_or_else(|_| unreachable!());
    }

    let saddr = ip6.source().inner();
    let daddr = ip6.destination();

    let mut l3size = usize::from(Ipv6::MIN_LEN.get());
    let mut infrag_len = usize::from(ip6.payload_length());
    let mut proto = ip6.next_header();
    let mut check_l4 = true;
    let mut dont_fragment = true;
    let mut more_fragments = false;
    let mut frag_offset = FragOffset::MIN;
    let frag_id;

    if proto == NextHeader::IPV6_FRAG {
        let Ok((frag, _)) = Ipv6Frag::parse(&buf.as_ref()[l3size..total_len]) else {
            return Step::Done(Verdict::Drop(DropReason::Malformed));
        };
        let frag_len = usize::from(Ipv6Frag::LEN.get());
        let Some(rest) = infrag_len.checked_sub(frag_len) else {
            return Step::Done(Verdict::Drop(DropReason::Malformed));
        };
        l3size += frag_len;
        infrag_len = rest;
        proto = frag.next_header();
        dont_fragment = false;
        frag_id = fold_frag_id(frag.identification());
        if frag.is_fragmenting_payload() {
            more_fragments = frag.more_fragments();
            frag_offset = frag.fragment_offset();
            check_l4 = frag.is_first_fragment();
            if proto == NextHeader::ICMP6 {
                return Step::Reassemble;
            }
        }
    } else {
        frag_id = nat46.next_ip_id();
    }

    let is_icmp = proto == NextHeader::ICMP6;
    let table = nat46.read_table();
    let Some((v4src, v4dst)) =
        outer_addresses(&table, buf.as_ref(), l3size, total_len, saddr, daddr, is_icmp)
    else {
        return Step::Done(Verdict::Drop(DropReason::NoMatchingRule));
    };

    let mut tail_trim = 0usize;
    if check_l4 {
        let bytes = buf.as_mut();
        match proto {
            NextHeader::TCP if total_len >= l3size + TCP_CSUM_OFFSET + 2 => {
                swap_pseudoheaders(
                    bytes,
                    l3size + TCP_CSUM_OFFSET,
                    &saddr,
                    &daddr,
                    v4src,
                    v4dst,
                    infrag_len,
                    NextHeader::TCP,
                );
            }
            NextHeader::UDP if total_len >= l3size + UDP_CSUM_OFFSET + 2 => {
                // a zero checksum stays zero; the v4 side tolerates it
                if read_u16(bytes, l3size + UDP_CSUM_OFFSET) != 0 {
                    swap_pseudoheaders(
                        bytes,
                        l3size + UDP_CSUM_OFFSET,
                        &saddr,
                        &daddr,
                        v4src,
                        v4dst,
                        infrag_len,
                        NextHeader::UDP,
                    );
                }
            }
            NextHeader::ICMP6 => {
                match fix_icmp6(&table, bytes, l3size, &saddr, &daddr, infrag_len) {
                    Ok(trim) => tail_trim = trim,
                    Err(reason) => return Step::Done(Verdict::Drop(reason)),
                }
            }
            _ => {}
        }
    }
    drop(table);

    let trim = u16::try_from(tail_trim).unwrap_or_else(|_| unreachable!());
    if trim > 0 {
        buf.trim_from_end(trim)
            .map(|_| ())
            .unwrap_or_else(|_| unreachable!());
    }
    let front_trim = u16::try_from(l3size - usize::from(Ipv4::MIN_LEN.get()))
        .unwrap_or_else(|_| unreachable!());
    buf.trim_from_start(front_trim)
        .map(|_| ())
        .unwrap_or_else(|_| unreachable!());

    let Ok(src) = UnicastIpv4Addr::new(v4src) else {
        return Step::Done(Verdict::Drop(DropReason::Malformed));
    };
    let tclass = ip6.traffic_class();
    let mut ip4 = Ipv4::default();
    ip4.set_source(src)
        .set_destination(v4dst)
        .set_ttl(ip6.hop_limit())
        .set_protocol(if is_icmp { NextHeader::ICMP } else { proto })
        .set_dscp(Dscp::new(tclass >> 2).unwrap_or_else(|_| unreachable!()))
        .set_ecn(Ecn::new(tclass & 0x3).unwrap_or_else(|_| unreachable!()))
        .set_identification(frag_id)
        .set_dont_fragment(dont_fragment)
        .set_more_fragments(more_fragments)
        .set_fragment_offset(frag_offset);
    if ip4.set_payload_len(infrag_len - tail_trim).is_err() {
        return Step::Done(Verdict::Drop(DropReason::Malformed));
    }
    ip4.update_checksum(&());
    ip4.deparse(&mut buf.as_mut()[..usize::from(Ipv4::MIN_LEN.get())])
        .map(|_| ())
        .unwrap_or_else(|_| unreachable!());

    trace!("translated {saddr} -> {daddr} to {v4src} -> {v4dst}");
    Step::Done(Verdict::Forward)
}

/// Resolve the IPv4 source and destination for the outgoing packet.
///
/// The normal case decodes the destination under the matched pair's local
/// rule and the source under its remote rule.  ICMPv6 errors may come from
/// routers outside any mapping; those are represented by the destination
/// address, or, when the source rule lookup fails entirely, by the local
/// rule's v4 prefix address with the destination recovered from the packet
/// embedded in the error.
fn outer_addresses(
    table: &RuleTable,
    bytes: &[u8],
    l3size: usize,
    total_len: usize,
    saddr: Ipv6Addr,
    daddr: Ipv6Addr,
    is_icmp: bool,
) -> Option<(Ipv4Addr, Ipv4Addr)> {
    if let Some(pair) = table.lookup(RuleKind::V6Remote, IpAddr::V6(saddr)) {
        let src = codec::decode_v6_to_v4(&pair.remote, saddr);
        let dst = codec::decode_v6_to_v4(&pair.local, daddr);
        match (src, dst) {
            (Some(src), Some(dst)) => return Some((src, dst)),
            (None, Some(dst)) if is_icmp => return Some((dst, dst)),
            _ => {}
        }
    }
    if !is_icmp {
        return None;
    }
    let icmp_type = *bytes.get(l3size)?;
    if !(1..=4).contains(&icmp_type) {
        return None;
    }
    let inner = bytes.get(l3size + 8..total_len)?;
    let (inner, _) = Ipv6::parse(inner).ok()?;
    // The embedded packet flows the opposite way: its source is the host
    // this error must reach.
    let pair = table.lookup(RuleKind::V6Remote, IpAddr::V6(inner.destination()))?;
    let dst = codec::decode_v6_to_v4(&pair.local, inner.source().inner())?;
    Some((pair.local.v4_prefix.addr(), dst))
}

#[allow(clippy::too_many_arguments)]
fn swap_pseudoheaders(
    bytes: &mut [u8],
    at: usize,
    saddr: &Ipv6Addr,
    daddr: &Ipv6Addr,
    v4src: Ipv4Addr,
    v4dst: Ipv4Addr,
    l4len: usize,
    proto: NextHeader,
) {
    let len32 = u32::try_from(l4len).unwrap_or_else(|_| unreachable!());
    let len16 = u16::try_from(l4len).unwrap_or_else(|_| unreachable!());
    let old = read_u16(bytes, at);
    let csum = remove_ipv6_pseudoheader(old, saddr, daddr, len32, proto.as_u8());
    let csum = add_ipv4_pseudoheader(csum, v4src, v4dst, len16, proto.as_u8());
    write_u16(bytes, at, csum);
}

// Rewrite an ICMPv6 message into an ICMPv4 one in place, embedded packet
// included.  Returns the number of bytes the message shrank by.
fn fix_icmp6(
    table: &RuleTable,
    bytes: &mut [u8],
    l3size: usize,
    saddr: &Ipv6Addr,
    daddr: &Ipv6Addr,
    infrag_len: usize,
) -> Result<usize, DropReason> {
    if bytes.len() < l3size + 8 {
        return Err(DropReason::Malformed);
    }
    let len32 = u32::try_from(infrag_len).unwrap_or_else(|_| unreachable!());
    // ICMPv4 checksums cover no pseudo-header
    let mut csum = read_u16(bytes, l3size + ICMP_CSUM_OFFSET);
    csum = remove_ipv6_pseudoheader(csum, saddr, daddr, len32, NextHeader::ICMP6.as_u8());

    let icmp_type = bytes[l3size];
    let code = bytes[l3size + 1];
    let rest = [
        bytes[l3size + 4],
        bytes[l3size + 5],
        bytes[l3size + 6],
        bytes[l3size + 7],
    ];
    let Some(front) = icmp::icmp6_to_icmp4(icmp_type, code, rest) else {
        debug!("ICMPv6 type {icmp_type} code {code} has no ICMPv4 counterpart");
        return Err(DropReason::UnsupportedIcmp);
    };
    let old_front = u16::from_be_bytes([icmp_type, code]);
    let new_front = u16::from_be_bytes([front.icmp_type, front.code]);
    csum = update16(csum, old_front, new_front);
    bytes[l3size] = front.icmp_type;
    bytes[l3size + 1] = front.code;
    for word in 0..2 {
        let at = l3size + 4 + 2 * word;
        let old = read_u16(bytes, at);
        let new = u16::from_be_bytes([front.rest[2 * word], front.rest[2 * word + 1]]);
        if old != new {
            csum = update16(csum, old, new);
            write_u16(bytes, at, new);
        }
    }

    let mut tail_trim = 0;
    if (1..=4).contains(&icmp_type) {
        tail_trim = fix_embedded(table, bytes, l3size + 8, &mut csum)?;
    }
    write_u16(bytes, l3size + ICMP_CSUM_OFFSET, csum);
    Ok(tail_trim)
}

// Translate the IPv6 packet embedded in an ICMP error to IPv4, shifting the
// bytes after its network header left by the header-size delta.  `outer_csum`
// absorbs every byte change so the caller can write a consistent checksum.
#[allow(clippy::too_many_lines)]
fn fix_embedded(
    table: &RuleTable,
    bytes: &mut [u8],
    inner_at: usize,
    outer_csum: &mut u16,
) -> Result<usize, DropReason> {
    let end = bytes.len();
    let Ok((embedded, _)) =
        EmbeddedHeaders::parse_with(EmbeddedIpVersion::Ipv6, &bytes[inner_at..end])
    else {
        return Err(DropReason::Malformed);
    };
    if embedded.is_nested_error() {
        return Err(DropReason::NestedIcmpError);
    }
    let Net::Ipv6(inner) = embedded.net() else {
        return Err(DropReason::Malformed);
    };
    let isrc = inner.source().inner();
    let idst = inner.destination();

    // The embedded packet flows the opposite way: its destination sits on
    // the remote (v6) side.
    let Some(pair) = table.lookup(RuleKind::V6Remote, IpAddr::V6(idst)) else {
        return Err(DropReason::NoMatchingRule);
    };
    let Some(v4dst) = codec::decode_v6_to_v4(&pair.remote, idst) else {
        return Err(DropReason::NoMatchingRule);
    };
    let Some(v4src) = codec::decode_v6_to_v4(&pair.local, isrc) else {
        return Err(DropReason::NoMatchingRule);
    };
    let Ok(src) = UnicastIpv4Addr::new(v4src) else {
        return Err(DropReason::Malformed);
    };

    let mut in_payload = usize::from(inner.payload_length());
    let mut proto = inner.next_header();
    let mut id = 0u16;
    let mut dont_fragment = true;
    let mut more_fragments = false;
    let mut offset = FragOffset::MIN;
    let mut inner_l3 = usize::from(Ipv6::MIN_LEN.get());
    if let Some(frag) = embedded.frag() {
        inner_l3 += usize::from(Ipv6Frag::LEN.get());
        in_payload = in_payload.saturating_sub(usize::from(Ipv6Frag::LEN.get()));
        proto = frag.next_header();
        dont_fragment = false;
        id = fold_frag_id(frag.identification());
        if frag.is_fragmenting_payload() {
            more_fragments = frag.more_fragments();
            offset = frag.fragment_offset();
        }
    } else if proto == NextHeader::IPV6_FRAG {
        // cut off mid-extension-header
        return Err(DropReason::Malformed);
    }

    let t_at = inner_at + inner_l3;
    let len32 = u32::try_from(in_payload).unwrap_or_else(|_| unreachable!());
    let len16 = u16::try_from(in_payload).unwrap_or_else(|_| unreachable!());
    match embedded.transport() {
        Some(EmbeddedTransport::Tcp(tcp)) if tcp.is_full() => {
            let at = t_at + TCP_CSUM_OFFSET;
            let old = read_u16(bytes, at);
            let csum = remove_ipv6_pseudoheader(old, &isrc, &idst, len32, NextHeader::TCP.as_u8());
            let csum = add_ipv4_pseudoheader(csum, v4src, v4dst, len16, NextHeader::TCP.as_u8());
            write_u16(bytes, at, csum);
            *outer_csum = update16(*outer_csum, old, csum);
        }
        Some(EmbeddedTransport::Udp(udp)) if udp.is_full() => {
            let at = t_at + UDP_CSUM_OFFSET;
            let old = read_u16(bytes, at);
            if old != 0 {
                let csum =
                    remove_ipv6_pseudoheader(old, &isrc, &idst, len32, NextHeader::UDP.as_u8());
                let csum =
                    add_ipv4_pseudoheader(csum, v4src, v4dst, len16, NextHeader::UDP.as_u8());
                write_u16(bytes, at, csum);
                *outer_csum = update16(*outer_csum, old, csum);
            }
        }
        // Only a full header carries the checksum; echo in a partial header
        // is copied through untouched.
        Some(EmbeddedTransport::Icmp6(icmp6)) if end >= t_at + 8 => {
            let at = t_at + ICMP_CSUM_OFFSET;
            let old = read_u16(bytes, at);
            let mut csum =
                remove_ipv6_pseudoheader(old, &isrc, &idst, len32, NextHeader::ICMP6.as_u8());
            let new_type = match icmp6.type_u8() {
                128 => Some(8u8),
                129 => Some(0u8),
                _ => None,
            };
            if let Some(new_type) = new_type {
                let old_word = read_u16(bytes, t_at);
                let new_word = u16::from_be_bytes([new_type, icmp6.code_u8()]);
                csum = update16(csum, old_word, new_word);
                bytes[t_at] = new_type;
                *outer_csum = update16(*outer_csum, old_word, new_word);
            }
            write_u16(bytes, at, csum);
            *outer_csum = update16(*outer_csum, old, csum);
        }
        _ => {}
    }

    let v4proto = if proto == NextHeader::ICMP6 {
        NextHeader::ICMP
    } else {
        proto
    };
    let tclass = inner.traffic_class();
    let mut ip4 = Ipv4::default();
    ip4.set_source(src)
        .set_destination(v4dst)
        .set_ttl(inner.hop_limit())
        .set_protocol(v4proto)
        .set_dscp(Dscp::new(tclass >> 2).unwrap_or_else(|_| unreachable!()))
        .set_ecn(Ecn::new(tclass & 0x3).unwrap_or_else(|_| unreachable!()))
        .set_identification(id)
        .set_dont_fragment(dont_fragment)
        .set_more_fragments(more_fragments)
        .set_fragment_offset(offset);
    if ip4.set_payload_len(in_payload).is_err() {
        return Err(DropReason::Malformed);
    }
    ip4.update_checksum(&());
    let mut hdr = [0u8; 20];
    ip4.deparse(&mut hdr)
        .map(|_| ())
        .unwrap_or_else(|_| unreachable!());

    *outer_csum = remove_block(*outer_csum, &bytes[inner_at..inner_at + inner_l3]);
    *outer_csum = add_block(*outer_csum, &hdr);
    bytes.copy_within(inner_at + inner_l3..end, inner_at + hdr.len());
    bytes[inner_at..inner_at + hdr.len()].copy_from_slice(&hdr);
    Ok(inner_l3 - hdr.len())
}
