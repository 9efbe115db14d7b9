// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Combined header types.

mod embedded;

use crate::ip::NextHeader;
use crate::ipv4::Ipv4;
use crate::ipv6::Ipv6;
use crate::parse::{DeParse, DeParseError, Parse, ParseError};
use std::num::NonZero;

pub use embedded::{EmbeddedError, EmbeddedHeaders, EmbeddedIpVersion, EmbeddedTransport};

/// A network-layer header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Net {
    /// An IPv4 header
    Ipv4(Ipv4),
    /// An IPv6 header
    Ipv6(Ipv6),
}

impl Net {
    /// Get the protocol / next-header field.
    ///
    /// For IPv6 this describes the header immediately following the fixed
    /// header, which may be an extension header rather than a transport.
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        match self {
            Net::Ipv4(ip) => ip.protocol(),
            Net::Ipv6(ip) => ip.next_header(),
        }
    }

    /// Get the TTL / hop limit.
    #[must_use]
    pub const fn ttl(&self) -> u8 {
        match self {
            Net::Ipv4(ip) => ip.ttl(),
            Net::Ipv6(ip) => ip.hop_limit(),
        }
    }
}

/// Parse a network header from the start of a buffer, switching on the
/// version nibble.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// A transparent IPv4 error
    #[error(transparent)]
    Ipv4(crate::ipv4::Ipv4Error),
    /// A transparent IPv6 error
    #[error(transparent)]
    Ipv6(crate::ipv6::Ipv6Error),
    /// The version nibble is neither 4 nor 6
    #[error("unsupported IP version {0}")]
    UnsupportedVersion(u8),
}

impl Parse for Net {
    type Error = NetError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        let Some(first) = buf.first() else {
            return Err(ParseError::Length(crate::parse::LengthError {
                expected: NonZero::new(1).unwrap_or_else(|| unreachable!()),
                actual: 0,
            }));
        };
        match first >> 4 {
            4 => {
                let (ip, consumed) = Ipv4::parse(buf).map_err(|e| match e {
                    ParseError::Length(l) => ParseError::Length(l),
                    ParseError::BufferTooLong(l) => ParseError::BufferTooLong(l),
                    ParseError::Invalid(e) => ParseError::Invalid(NetError::Ipv4(e)),
                })?;
                Ok((Net::Ipv4(ip), consumed))
            }
            6 => {
                let (ip, consumed) = Ipv6::parse(buf).map_err(|e| match e {
                    ParseError::Length(l) => ParseError::Length(l),
                    ParseError::BufferTooLong(l) => ParseError::BufferTooLong(l),
                    ParseError::Invalid(e) => ParseError::Invalid(NetError::Ipv6(e)),
                })?;
                Ok((Net::Ipv6(ip), consumed))
            }
            version => Err(ParseError::Invalid(NetError::UnsupportedVersion(version))),
        }
    }
}

impl DeParse for Net {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        match self {
            Net::Ipv4(ip) => ip.size(),
            Net::Ipv6(ip) => ip.size(),
        }
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        match self {
            Net::Ipv4(ip) => ip.deparse(buf),
            Net::Ipv6(ip) => ip.deparse(buf),
        }
    }
}
