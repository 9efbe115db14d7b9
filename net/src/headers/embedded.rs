// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Headers of the original packet embedded in an ICMP error message.
//!
//! RFC 792 only guarantees 64 bits of the original payload beyond the IP
//! header, so the transport header may be cut short.  The truncated header
//! types preserve whatever bytes were present.

use crate::headers::Net;
use crate::icmp4::TruncatedIcmp4;
use crate::icmp6::TruncatedIcmp6;
use crate::ip::NextHeader;
use crate::ipv4::Ipv4;
use crate::ipv6::{Ipv6, Ipv6Frag};
use crate::parse::{
    DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError, ParseWith,
};
use crate::tcp::{TruncatedTcp, TruncatedTcpError};
use crate::udp::{TruncatedUdp, TruncatedUdpError};
use std::num::NonZero;

/// Which IP version the embedded packet must carry.
///
/// An ICMPv4 error embeds an IPv4 packet and an ICMPv6 error an IPv6 packet;
/// the version is dictated by the outer message, not the payload bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EmbeddedIpVersion {
    /// The embedded packet is IPv4
    Ipv4,
    /// The embedded packet is IPv6
    Ipv6,
}

/// The transport header of the embedded packet, possibly truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedTransport {
    /// A (possibly truncated) TCP header
    Tcp(TruncatedTcp),
    /// A (possibly truncated) UDP header
    Udp(TruncatedUdp),
    /// A (possibly truncated) `ICMPv4` header
    Icmp4(TruncatedIcmp4),
    /// A (possibly truncated) `ICMPv6` header
    Icmp6(TruncatedIcmp6),
}

impl EmbeddedTransport {
    /// Get the source port, or the echo identifier for an ICMP echo message.
    #[must_use]
    pub fn source_port(&self) -> Option<u16> {
        match self {
            EmbeddedTransport::Tcp(tcp) => Some(tcp.source().as_u16()),
            EmbeddedTransport::Udp(udp) => Some(udp.source().as_u16()),
            EmbeddedTransport::Icmp4(icmp) => icmp.echo_id(),
            EmbeddedTransport::Icmp6(icmp) => icmp.echo_id(),
        }
    }

    /// Get the destination port, or the echo identifier for an ICMP echo message.
    #[must_use]
    pub fn destination_port(&self) -> Option<u16> {
        match self {
            EmbeddedTransport::Tcp(tcp) => Some(tcp.destination().as_u16()),
            EmbeddedTransport::Udp(udp) => Some(udp.destination().as_u16()),
            EmbeddedTransport::Icmp4(icmp) => icmp.echo_id(),
            EmbeddedTransport::Icmp6(icmp) => icmp.echo_id(),
        }
    }

    /// Returns `true` if the embedded transport is itself an ICMP error message.
    #[must_use]
    pub fn is_icmp_error(&self) -> bool {
        match self {
            EmbeddedTransport::Tcp(_) | EmbeddedTransport::Udp(_) => false,
            EmbeddedTransport::Icmp4(icmp) => icmp.is_error(),
            EmbeddedTransport::Icmp6(icmp) => icmp.is_error(),
        }
    }
}

impl DeParse for EmbeddedTransport {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        match self {
            EmbeddedTransport::Tcp(tcp) => tcp.size(),
            EmbeddedTransport::Udp(udp) => udp.size(),
            EmbeddedTransport::Icmp4(icmp) => icmp.size(),
            EmbeddedTransport::Icmp6(icmp) => icmp.size(),
        }
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        match self {
            EmbeddedTransport::Tcp(tcp) => tcp.deparse(buf),
            EmbeddedTransport::Udp(udp) => udp.deparse(buf),
            EmbeddedTransport::Icmp4(icmp) => icmp.deparse(buf),
            EmbeddedTransport::Icmp6(icmp) => icmp.deparse(buf),
        }
    }
}

/// The parsed headers of the packet embedded in an ICMP error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedHeaders {
    net: Net,
    frag: Option<Ipv6Frag>,
    transport: Option<EmbeddedTransport>,
}

impl EmbeddedHeaders {
    /// Assemble embedded headers from their parts.
    #[must_use]
    pub fn new(net: Net, frag: Option<Ipv6Frag>, transport: Option<EmbeddedTransport>) -> Self {
        Self {
            net,
            frag,
            transport,
        }
    }

    /// Get the network header of the embedded packet
    #[must_use]
    pub fn net(&self) -> &Net {
        &self.net
    }

    /// Replace the network header of the embedded packet
    pub fn set_net(&mut self, net: Net) -> &mut Self {
        self.net = net;
        self
    }

    /// Get the fragment extension header of the embedded packet, if present
    #[must_use]
    pub fn frag(&self) -> Option<&Ipv6Frag> {
        self.frag.as_ref()
    }

    /// Remove and return the fragment extension header, if present
    pub fn take_frag(&mut self) -> Option<Ipv6Frag> {
        self.frag.take()
    }

    /// Get the transport header of the embedded packet, if present
    #[must_use]
    pub fn transport(&self) -> Option<&EmbeddedTransport> {
        self.transport.as_ref()
    }

    /// Get a mutable reference to the transport header, if present
    pub fn transport_mut(&mut self) -> Option<&mut EmbeddedTransport> {
        self.transport.as_mut()
    }

    /// Returns `true` if the embedded packet is itself an ICMP error message.
    ///
    /// RFC 4443 forbids generating an ICMP error in response to an ICMP
    /// error, so such packets are dropped rather than translated.
    #[must_use]
    pub fn is_nested_error(&self) -> bool {
        self.transport
            .as_ref()
            .is_some_and(EmbeddedTransport::is_icmp_error)
    }

    fn parse_transport(
        next: NextHeader,
        buf: &[u8],
    ) -> Result<Option<(EmbeddedTransport, NonZero<u16>)>, ParseError<EmbeddedError>> {
        let parsed = match next {
            NextHeader::TCP => match TruncatedTcp::parse(buf) {
                Ok((tcp, consumed)) => Some((EmbeddedTransport::Tcp(tcp), consumed)),
                Err(ParseError::Length(_)) => None,
                Err(ParseError::BufferTooLong(len)) => {
                    return Err(ParseError::BufferTooLong(len));
                }
                Err(ParseError::Invalid(e)) => {
                    return Err(ParseError::Invalid(EmbeddedError::Tcp(e)));
                }
            },
            NextHeader::UDP => match TruncatedUdp::parse(buf) {
                Ok((udp, consumed)) => Some((EmbeddedTransport::Udp(udp), consumed)),
                Err(ParseError::Length(_)) => None,
                Err(ParseError::BufferTooLong(len)) => {
                    return Err(ParseError::BufferTooLong(len));
                }
                Err(ParseError::Invalid(e)) => {
                    return Err(ParseError::Invalid(EmbeddedError::Udp(e)));
                }
            },
            NextHeader::ICMP => match TruncatedIcmp4::parse(buf) {
                Ok((icmp, consumed)) => Some((EmbeddedTransport::Icmp4(icmp), consumed)),
                Err(ParseError::Length(_)) => None,
                Err(ParseError::BufferTooLong(len)) => {
                    return Err(ParseError::BufferTooLong(len));
                }
                Err(ParseError::Invalid(())) => unreachable!(),
            },
            NextHeader::ICMP6 => match TruncatedIcmp6::parse(buf) {
                Ok((icmp, consumed)) => Some((EmbeddedTransport::Icmp6(icmp), consumed)),
                Err(ParseError::Length(_)) => None,
                Err(ParseError::BufferTooLong(len)) => {
                    return Err(ParseError::BufferTooLong(len));
                }
                Err(ParseError::Invalid(())) => unreachable!(),
            },
            // Other protocols pass through untouched
            _ => None,
        };
        Ok(parsed)
    }
}

/// Errors which can occur when parsing the embedded packet of an ICMP error.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddedError {
    /// A transparent error from the embedded IPv4 header
    #[error(transparent)]
    Ipv4(crate::ipv4::Ipv4Error),
    /// A transparent error from the embedded IPv6 header
    #[error(transparent)]
    Ipv6(crate::ipv6::Ipv6Error),
    /// A transparent error from the embedded TCP header
    #[error(transparent)]
    Tcp(TruncatedTcpError),
    /// A transparent error from the embedded UDP header
    #[error(transparent)]
    Udp(TruncatedUdpError),
}

impl ParseWith for EmbeddedHeaders {
    type Error = EmbeddedError;
    type Param = EmbeddedIpVersion;

    fn parse_with(
        param: Self::Param,
        buf: &[u8],
    ) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        let (net, consumed) = match param {
            EmbeddedIpVersion::Ipv4 => {
                let (ip, consumed) = Ipv4::parse(buf).map_err(|e| match e {
                    ParseError::Length(l) => ParseError::Length(l),
                    ParseError::BufferTooLong(l) => ParseError::BufferTooLong(l),
                    ParseError::Invalid(e) => ParseError::Invalid(EmbeddedError::Ipv4(e)),
                })?;
                (Net::Ipv4(ip), consumed)
            }
            EmbeddedIpVersion::Ipv6 => {
                let (ip, consumed) = Ipv6::parse(buf).map_err(|e| match e {
                    ParseError::Length(l) => ParseError::Length(l),
                    ParseError::BufferTooLong(l) => ParseError::BufferTooLong(l),
                    ParseError::Invalid(e) => ParseError::Invalid(EmbeddedError::Ipv6(e)),
                })?;
                (Net::Ipv6(ip), consumed)
            }
        };
        let mut offset = consumed.into_non_zero_usize().get();
        let mut this = EmbeddedHeaders {
            net,
            frag: None,
            transport: None,
        };

        let (mut next, mut first_fragment) = match &this.net {
            Net::Ipv4(ip) => (ip.protocol(), ip.fragment_offset().raw() == 0),
            Net::Ipv6(ip) => (ip.next_header(), true),
        };

        if matches!(&this.net, Net::Ipv6(_)) && next == NextHeader::IPV6_FRAG {
            match Ipv6Frag::parse(&buf[offset..]) {
                Ok((frag, consumed)) => {
                    offset += consumed.into_non_zero_usize().get();
                    next = frag.next_header();
                    first_fragment = frag.is_first_fragment();
                    this.frag = Some(frag);
                }
                // The embedded packet was cut before the end of the
                // extension header; stop with what we have.
                Err(_) => {
                    #[allow(clippy::cast_possible_truncation)] // consumed fits u16
                    return Ok((this, NonZero::new(offset as u16).ok_or_else(|| unreachable!())?));
                }
            }
        }

        // Only the first fragment carries a transport header.
        if first_fragment {
            if let Some((transport, consumed)) = Self::parse_transport(next, &buf[offset..])? {
                offset += consumed.into_non_zero_usize().get();
                this.transport = Some(transport);
            }
        }

        if offset > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(offset));
        }
        #[allow(clippy::cast_possible_truncation)] // bounded above
        let consumed = NonZero::new(offset as u16).ok_or_else(|| unreachable!())?;
        Ok((this, consumed))
    }
}

impl DeParse for EmbeddedHeaders {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        let net = self.net.size().get();
        let frag = self.frag.as_ref().map_or(0, |f| f.size().get());
        let transport = self.transport.as_ref().map_or(0, |t| t.size().get());
        NonZero::new(net + frag + transport).unwrap_or_else(|| unreachable!())
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        if buf.len() < self.size().into_non_zero_usize().get() {
            return Err(DeParseError::Length(LengthError {
                expected: self.size().into_non_zero_usize(),
                actual: buf.len(),
            }));
        }
        let mut offset = self
            .net
            .deparse(buf)
            .map_err(|_| unreachable!())?
            .into_non_zero_usize()
            .get();
        if let Some(frag) = &self.frag {
            offset += frag
                .deparse(&mut buf[offset..])
                .map_err(|_| unreachable!())?
                .into_non_zero_usize()
                .get();
        }
        if let Some(transport) = &self.transport {
            offset += transport
                .deparse(&mut buf[offset..])
                .map_err(|_| unreachable!())?
                .into_non_zero_usize()
                .get();
        }
        #[allow(clippy::cast_possible_truncation)] // checked against size above
        Ok(NonZero::new(offset as u16).unwrap_or_else(|| unreachable!()))
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use crate::headers::embedded::{EmbeddedHeaders, EmbeddedIpVersion, EmbeddedTransport};
    use crate::headers::Net;
    use crate::parse::{DeParse, IntoNonZeroUSize, ParseWith};
    use crate::tcp::TruncatedTcp;
    use crate::udp::TruncatedUdp;
    use etherparse::{IpNumber, Ipv4Header, Ipv6Header};

    fn v4_header(protocol: IpNumber, payload_len: u16) -> Vec<u8> {
        let mut ip = Ipv4Header::new(payload_len, 64, protocol, [192, 0, 2, 1], [198, 51, 100, 1])
            .unwrap();
        ip.header_checksum = ip.calc_header_checksum();
        ip.to_bytes().to_vec()
    }

    #[test]
    fn embedded_v4_udp() {
        let mut bytes = v4_header(IpNumber::UDP, 12);
        // Full UDP header plus 4 payload bytes
        bytes.extend_from_slice(&[0x12, 0x34, 0x00, 0x35, 0x00, 0x0c, 0x00, 0x00]);
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let (parsed, consumed) =
            EmbeddedHeaders::parse_with(EmbeddedIpVersion::Ipv4, &bytes).unwrap();
        assert_eq!(consumed.get(), 28);
        assert!(matches!(parsed.net(), Net::Ipv4(_)));
        let transport = parsed.transport().unwrap();
        assert!(matches!(
            transport,
            EmbeddedTransport::Udp(TruncatedUdp::FullHeader(_))
        ));
        assert_eq!(transport.source_port(), Some(0x1234));
        assert_eq!(transport.destination_port(), Some(53));
        assert!(!parsed.is_nested_error());
    }

    #[test]
    fn embedded_v4_truncated_tcp() {
        let mut bytes = v4_header(IpNumber::TCP, 8);
        // RFC 792 minimum: 64 bits of the original payload
        bytes.extend_from_slice(&[0x00, 0x50, 0x01, 0xbb, 0xde, 0xad, 0xbe, 0xef]);
        let (parsed, consumed) =
            EmbeddedHeaders::parse_with(EmbeddedIpVersion::Ipv4, &bytes).unwrap();
        assert_eq!(consumed.get(), 28);
        let transport = parsed.transport().unwrap();
        assert!(matches!(
            transport,
            EmbeddedTransport::Tcp(TruncatedTcp::PartialHeader(_))
        ));
        assert_eq!(transport.source_port(), Some(80));
        assert_eq!(transport.destination_port(), Some(443));
    }

    #[test]
    fn embedded_v6_frag_then_udp() {
        let ip = Ipv6Header {
            payload_length: 16,
            next_header: IpNumber::IPV6_FRAGMENTATION_HEADER,
            hop_limit: 64,
            source: [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
            destination: [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2],
            ..Default::default()
        };
        let mut bytes = ip.to_bytes().to_vec();
        // Atomic fragment header carrying UDP
        bytes.extend_from_slice(&[17, 0, 0, 0, 0xab, 0xcd, 0xef, 0x01]);
        bytes.extend_from_slice(&[0x12, 0x34, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00]);
        let (parsed, consumed) =
            EmbeddedHeaders::parse_with(EmbeddedIpVersion::Ipv6, &bytes).unwrap();
        assert_eq!(consumed.get(), 56);
        assert_eq!(parsed.frag().unwrap().identification(), 0xabcd_ef01);
        assert!(parsed.transport().unwrap().source_port() == Some(0x1234));
        assert_eq!(
            consumed.into_non_zero_usize().get(),
            parsed.size().into_non_zero_usize().get()
        );
    }

    #[test]
    fn non_first_fragment_has_no_transport() {
        let mut ip = Ipv4Header::new(16, 64, IpNumber::UDP, [192, 0, 2, 1], [198, 51, 100, 1])
            .unwrap();
        ip.fragment_offset = 185.try_into().unwrap();
        ip.header_checksum = ip.calc_header_checksum();
        let mut bytes = ip.to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let (parsed, consumed) =
            EmbeddedHeaders::parse_with(EmbeddedIpVersion::Ipv4, &bytes).unwrap();
        assert_eq!(consumed.get(), 20);
        assert!(parsed.transport().is_none());
    }
}
