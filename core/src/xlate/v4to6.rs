// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The IPv4 to IPv6 translation path.
//!
//! The IPv4 header is replaced by a freshly built IPv6 header, plus a
//! fragment extension header when the packet is fragmented (or when the
//! instance is configured to advertise one on every DF-clear packet).  The
//! MAP encodings need the flow's transport ports, so those are extracted
//! before the rule lookup; for ICMP the echo identifier stands in, and for
//! errors the ports come from the embedded packet, swapped, because the
//! embedded packet flows the opposite way.
//!
//! TCP and UDP checksums are patched incrementally for the pseudo-header
//! swap.  ICMP messages change transport protocol entirely (1 to 58) and
//! gain a pseudo-header, so their checksum is rebuilt from scratch after
//! every edit, embedded packet included.

use crate::checksum::{add_block, add_ipv6_pseudoheader, remove_ipv4_pseudoheader, update16};
use crate::codec;
use crate::icmp;
use crate::instance::{DropReason, Nat46, TranslationError, Verdict};
use crate::rule::XlateStyle;
use crate::table::{RuleKind, RuleTable};
use crate::xlate::{ICMP_CSUM_OFFSET, TCP_CSUM_OFFSET, UDP_CSUM_OFFSET, read_u16, write_u16};
use net::buffer::PacketBufferMut;
use net::headers::{EmbeddedHeaders, EmbeddedIpVersion, EmbeddedTransport, Net};
use net::ip::NextHeader;
use net::ipv4::Ipv4;
use net::ipv6::{Ipv6, Ipv6Frag, UnicastIpv6Addr};
use net::parse::{DeParse, Parse, ParseWith};
use std::net::IpAddr;
use tracing::{debug, trace};

// Every early exit in one type: verdicts end the translation cleanly,
// errors promise the caller an untouched packet.
enum Abort {
    Drop(DropReason),
    Error(TranslationError),
}

impl From<DropReason> for Abort {
    fn from(reason: DropReason) -> Self {
        Abort::Drop(reason)
    }
}

pub(crate) fn translate<Buf: PacketBufferMut>(
    nat46: &Nat46,
    buf: &mut Buf,
) -> Result<Verdict, TranslationError> {
    match translate_inner(nat46, buf) {
        Ok(()) => Ok(Verdict::Forward),
        Err(Abort::Drop(reason)) => Ok(Verdict::Drop(reason)),
        Err(Abort::Error(e)) => Err(e),
    }
}

#[allow(clippy::too_many_lines)]
fn translate_inner<Buf: PacketBufferMut>(nat46: &Nat46, buf: &mut Buf) -> Result<(), Abort> {
    let Ok((ip4, _)) = Ipv4::parse(buf.as_ref()) else {
        return Err(DropReason::Malformed.into());
    };
    let ihl = ip4.header_len();
    let mut total = usize::from(ip4.total_len());
    if buf.as_ref().len() < total || total < ihl {
        debug!("IPv4 packet shorter than its total length field");
        return Err(DropReason::Malformed.into());
    }
    let padding = u16::try_from(buf.as_ref().len() - total).unwrap_or_else(|_| unreachable!());
    if padding > 0 {
        buf.trim_from_end(padding)
            .map(|_| ())
            .unwrap_or_else(|_| unreachable!());
    }

    let add_frag = ip4.is_fragment()
        || (!ip4.dont_fragment() && nat46.add_dummy_fragment_header());
    let new_front =
        usize::from(Ipv6::MIN_LEN.get()) + if add_frag { usize::from(Ipv6Frag::LEN.get()) } else { 0 };

    // Check head room before anything is modified, so a buffer-too-small
    // caller can grow the buffer and retry.
    if new_front > ihl {
        let needed = u16::try_from(new_front - ihl).unwrap_or_else(|_| unreachable!());
        let available = buf.headroom();
        if available < needed {
            return Err(Abort::Error(TranslationError::BufferTooSmall {
                needed,
                available,
            }));
        }
    }

    let first_fragment = ip4.fragment_offset().raw() == 0;
    let proto = ip4.protocol();
    let mut sport = None;
    let mut dport = None;

    let table = nat46.read_table();
    if first_fragment {
        match proto {
            NextHeader::TCP | NextHeader::UDP if total >= ihl + 4 => {
                let bytes = buf.as_ref();
                sport = Some(read_u16(bytes, ihl));
                dport = Some(read_u16(bytes, ihl + 2));
            }
            NextHeader::ICMP => {
                if ip4.is_fragment() {
                    // the ICMPv6 checksum needs the whole message
                    return Err(DropReason::FragmentedIcmp.into());
                }
                let (s, d, new_total) = fix_icmp4(&table, buf, ihl, total)?;
                sport = s;
                dport = d;
                total = new_total;
            }
            _ => {}
        }
    }

    let saddr = ip4.source().inner();
    let daddr = ip4.destination();
    let Some(pair) = table.lookup(RuleKind::V4Remote, IpAddr::V4(daddr)) else {
        return Err(DropReason::NoMatchingRule.into());
    };
    let Some(v6src) = codec::encode_v4_to_v6(&pair.local, saddr, sport) else {
        return Err(DropReason::NoMatchingRule.into());
    };
    let Some(v6dst) = codec::encode_v4_to_v6(&pair.remote, daddr, dport) else {
        return Err(DropReason::NoMatchingRule.into());
    };
    let Ok(src) = UnicastIpv6Addr::new(v6src) else {
        return Err(DropReason::Malformed.into());
    };

    let next = if proto == NextHeader::ICMP {
        NextHeader::ICMP6
    } else {
        proto
    };
    let frag = if add_frag {
        // A MAP CE shares its v4 address; take the identification from the
        // CE's port set so the far end can attribute the fragments.
        let id = if pair.local.style == XlateStyle::Map && pair.local.ea_len > 0 {
            nat46
                .next_ce_port(&pair.local, sport.unwrap_or(0))
                .map_or(u32::from(ip4.identification()), u32::from)
        } else {
            u32::from(ip4.identification())
        };
        Some(Ipv6Frag::new(
            next,
            ip4.fragment_offset(),
            ip4.more_fragments(),
            id,
        ))
    } else {
        None
    };
    drop(table);

    let l4len = total - ihl;
    let len32 = u32::try_from(l4len).unwrap_or_else(|_| unreachable!());
    let len16 = u16::try_from(l4len).unwrap_or_else(|_| unreachable!());
    if first_fragment {
        let bytes = buf.as_mut();
        match proto {
            NextHeader::TCP if total >= ihl + TCP_CSUM_OFFSET + 2 => {
                let at = ihl + TCP_CSUM_OFFSET;
                let old = read_u16(bytes, at);
                let csum =
                    remove_ipv4_pseudoheader(old, saddr, daddr, len16, NextHeader::TCP.as_u8());
                let csum =
                    add_ipv6_pseudoheader(csum, &v6src, &v6dst, len32, NextHeader::TCP.as_u8());
                write_u16(bytes, at, csum);
            }
            NextHeader::UDP if total >= ihl + 8 => {
                let at = ihl + UDP_CSUM_OFFSET;
                let old = read_u16(bytes, at);
                if old == 0 {
                    if ip4.is_fragment() {
                        // cannot recompute over a partial datagram
                        return Err(DropReason::Malformed.into());
                    }
                    // the checksum is mandatory over IPv6: build it from
                    // scratch (the field itself is zero and sums as such)
                    let csum = add_ipv6_pseudoheader(
                        add_block(0xffff, &bytes[ihl..total]),
                        &v6src,
                        &v6dst,
                        len32,
                        NextHeader::UDP.as_u8(),
                    );
                    write_u16(bytes, at, if csum == 0 { 0xffff } else { csum });
                } else {
                    let csum =
                        remove_ipv4_pseudoheader(old, saddr, daddr, len16, NextHeader::UDP.as_u8());
                    let csum =
                        add_ipv6_pseudoheader(csum, &v6src, &v6dst, len32, NextHeader::UDP.as_u8());
                    write_u16(bytes, at, csum);
                }
            }
            NextHeader::ICMP => {
                // by now the message body is fully rewritten; compute the
                // ICMPv6 checksum over it and the new pseudo-header
                let at = ihl + ICMP_CSUM_OFFSET;
                write_u16(bytes, at, 0);
                let csum = add_ipv6_pseudoheader(
                    add_block(0xffff, &bytes[ihl..total]),
                    &v6src,
                    &v6dst,
                    len32,
                    NextHeader::ICMP6.as_u8(),
                );
                write_u16(bytes, at, csum);
            }
            _ => {}
        }
    }

    if new_front >= ihl {
        let grow = u16::try_from(new_front - ihl).unwrap_or_else(|_| unreachable!());
        if grow > 0 {
            buf.prepend(grow)
                .map(|_| ())
                .unwrap_or_else(|_| unreachable!());
        }
    } else {
        // v4 options exceed the v6 front; drop them
        let trim = u16::try_from(ihl - new_front).unwrap_or_else(|_| unreachable!());
        buf.trim_from_start(trim)
            .map(|_| ())
            .unwrap_or_else(|_| unreachable!());
    }

    let payload_len = l4len + if frag.is_some() { usize::from(Ipv6Frag::LEN.get()) } else { 0 };
    let Ok(payload_len) = u16::try_from(payload_len) else {
        return Err(DropReason::Malformed.into());
    };
    let mut ip6 = Ipv6::default();
    ip6.set_source(src)
        .set_destination(v6dst)
        .set_next_header(if frag.is_some() {
            NextHeader::IPV6_FRAG
        } else {
            next
        })
        .set_hop_limit(ip4.ttl())
        .set_traffic_class((ip4.dscp().raw() << 2) | ip4.ecn().raw())
        .set_payload_length(payload_len);
    let bytes = buf.as_mut();
    let v6len = usize::from(Ipv6::MIN_LEN.get());
    ip6.deparse(&mut bytes[..v6len])
        .map(|_| ())
        .unwrap_or_else(|_| unreachable!());
    if let Some(frag) = &frag {
        frag.deparse(&mut bytes[v6len..new_front])
            .map(|_| ())
            .unwrap_or_else(|_| unreachable!());
    }

    trace!("translated {saddr} -> {daddr} to {v6src} -> {v6dst}");
    Ok(())
}

// Rewrite an ICMPv4 message into an ICMPv6 one in place.  For error
// messages the embedded IPv4 packet becomes an IPv6 one, which grows the
// buffer at the tail by the header-size delta.  Returns the flow ports for
// the outer rule lookup and the new packet length; the outer checksum is
// left to the caller, which rebuilds it from scratch.
#[allow(clippy::too_many_lines)]
fn fix_icmp4<Buf: PacketBufferMut>(
    table: &RuleTable,
    buf: &mut Buf,
    ihl: usize,
    total: usize,
) -> Result<(Option<u16>, Option<u16>, usize), Abort> {
    if total < ihl + 8 {
        return Err(DropReason::Malformed.into());
    }
    let (icmp_type, code, rest) = {
        let bytes = buf.as_ref();
        (
            bytes[ihl],
            bytes[ihl + 1],
            [
                bytes[ihl + 4],
                bytes[ihl + 5],
                bytes[ihl + 6],
                bytes[ihl + 7],
            ],
        )
    };
    let Some(front) = icmp::icmp4_to_icmp6(icmp_type, code, rest) else {
        debug!("ICMPv4 type {icmp_type} code {code} has no ICMPv6 counterpart");
        return Err(DropReason::UnsupportedIcmp.into());
    };

    // Echo and echo reply carry no embedded packet; the identifier doubles
    // as the flow port for the MAP encodings.
    if matches!(icmp_type, 8 | 0) {
        let id = u16::from_be_bytes([rest[0], rest[1]]);
        buf.as_mut()[ihl] = front.icmp_type;
        return Ok((Some(id), Some(id), total));
    }

    let inner_at = ihl + 8;
    let Ok((embedded, _)) =
        EmbeddedHeaders::parse_with(EmbeddedIpVersion::Ipv4, &buf.as_ref()[inner_at..total])
    else {
        return Err(DropReason::Malformed.into());
    };
    if embedded.is_nested_error() {
        return Err(DropReason::NestedIcmpError.into());
    }
    let Net::Ipv4(inner) = embedded.net() else {
        return Err(DropReason::Malformed.into());
    };
    let inner_ihl = inner.header_len();
    let isrc = inner.source().inner();
    let idst = inner.destination();

    let mut isport = None;
    let mut idport = None;
    let mut echo_remap = None;
    match embedded.transport() {
        Some(EmbeddedTransport::Tcp(tcp)) => {
            isport = Some(tcp.source().as_u16());
            idport = Some(tcp.destination().as_u16());
        }
        Some(EmbeddedTransport::Udp(udp)) => {
            isport = Some(udp.source().as_u16());
            idport = Some(udp.destination().as_u16());
        }
        Some(EmbeddedTransport::Icmp4(icmp4)) => match icmp4.type_u8() {
            8 => {
                echo_remap = Some(128u8);
                isport = icmp4.echo_id();
                idport = icmp4.echo_id();
            }
            0 => {
                echo_remap = Some(129u8);
                isport = icmp4.echo_id();
                idport = icmp4.echo_id();
            }
            _ => return Err(DropReason::UnsupportedInnerTransport.into()),
        },
        Some(EmbeddedTransport::Icmp6(_)) => {
            return Err(DropReason::UnsupportedInnerTransport.into());
        }
        None => {}
    }

    // The embedded packet flows the opposite way: its source sits on the
    // remote (v4) side.
    let Some(pair) = table.lookup(RuleKind::V4Remote, IpAddr::V4(isrc)) else {
        return Err(DropReason::NoMatchingRule.into());
    };
    let Some(v6idst) = codec::encode_v4_to_v6(&pair.local, idst, idport) else {
        return Err(DropReason::NoMatchingRule.into());
    };
    let Some(v6isrc) = codec::encode_v4_to_v6(&pair.remote, isrc, isport) else {
        return Err(DropReason::NoMatchingRule.into());
    };
    let Ok(src6) = UnicastIpv6Addr::new(v6isrc) else {
        return Err(DropReason::Malformed.into());
    };

    // Reshape the tail so the embedded network header area is exactly the
    // 40 bytes an IPv6 header needs.  Nothing was modified before this
    // point, so a failed append leaves the packet intact.
    let v6len = usize::from(Ipv6::MIN_LEN.get());
    let t_at_old = inner_at + inner_ihl;
    let t_at_new = inner_at + v6len;
    if inner_ihl <= v6len {
        let grow = u16::try_from(v6len - inner_ihl).unwrap_or_else(|_| unreachable!());
        if grow > 0 {
            buf.append(grow)
                .map(|_| ())
                .map_err(|e| {
                    Abort::Error(TranslationError::BufferTooSmall {
                        needed: e.requested,
                        available: e.available,
                    })
                })?;
        }
        buf.as_mut().copy_within(t_at_old..total, t_at_new);
    } else {
        let bytes = buf.as_mut();
        bytes.copy_within(t_at_old..total, t_at_new);
        let shrink = u16::try_from(inner_ihl - v6len).unwrap_or_else(|_| unreachable!());
        buf.trim_from_end(shrink)
            .map(|_| ())
            .unwrap_or_else(|_| unreachable!());
    }
    let new_total = total - inner_ihl + v6len;

    let bytes = buf.as_mut();
    bytes[ihl] = front.icmp_type;
    bytes[ihl + 1] = front.code;
    bytes[ihl + 4..ihl + 8].copy_from_slice(&front.rest);

    let inner_proto = inner.protocol();
    let in_l4len = usize::from(inner.total_len()).saturating_sub(inner_ihl);
    let ilen32 = u32::try_from(in_l4len).unwrap_or_else(|_| unreachable!());
    let ilen16 = u16::try_from(in_l4len).unwrap_or_else(|_| unreachable!());
    match embedded.transport() {
        Some(EmbeddedTransport::Tcp(tcp)) if tcp.is_full() => {
            let at = t_at_new + TCP_CSUM_OFFSET;
            let old = read_u16(bytes, at);
            let csum = remove_ipv4_pseudoheader(old, isrc, idst, ilen16, NextHeader::TCP.as_u8());
            let csum =
                add_ipv6_pseudoheader(csum, &v6isrc, &v6idst, ilen32, NextHeader::TCP.as_u8());
            write_u16(bytes, at, csum);
        }
        Some(EmbeddedTransport::Udp(udp)) if udp.is_full() => {
            let at = t_at_new + UDP_CSUM_OFFSET;
            let old = read_u16(bytes, at);
            if old != 0 {
                let csum =
                    remove_ipv4_pseudoheader(old, isrc, idst, ilen16, NextHeader::UDP.as_u8());
                let csum =
                    add_ipv6_pseudoheader(csum, &v6isrc, &v6idst, ilen32, NextHeader::UDP.as_u8());
                write_u16(bytes, at, csum);
            }
        }
        Some(EmbeddedTransport::Icmp4(icmp4)) => {
            if let Some(new_type) = echo_remap {
                let old_word = read_u16(bytes, t_at_new);
                let new_word = u16::from_be_bytes([new_type, icmp4.code_u8()]);
                bytes[t_at_new] = new_type;
                // only a full header carries the checksum
                if icmp4.echo_id().is_some() {
                    let at = t_at_new + ICMP_CSUM_OFFSET;
                    let csum = update16(read_u16(bytes, at), old_word, new_word);
                    let csum = add_ipv6_pseudoheader(
                        csum,
                        &v6isrc,
                        &v6idst,
                        ilen32,
                        NextHeader::ICMP6.as_u8(),
                    );
                    write_u16(bytes, at, csum);
                }
            }
        }
        _ => {}
    }

    let v6proto = if inner_proto == NextHeader::ICMP {
        NextHeader::ICMP6
    } else {
        inner_proto
    };
    let mut ip6 = Ipv6::default();
    ip6.set_source(src6)
        .set_destination(v6idst)
        .set_next_header(v6proto)
        .set_hop_limit(inner.ttl())
        .set_traffic_class((inner.dscp().raw() << 2) | inner.ecn().raw())
        .set_payload_length(ilen16);
    ip6.deparse(&mut bytes[inner_at..inner_at + v6len])
        .map(|_| ())
        .unwrap_or_else(|_| unreachable!());

    // The embedded packet flows the opposite way, so the outer ports are
    // the embedded ones swapped.
    Ok((idport, isport, new_total))
}
