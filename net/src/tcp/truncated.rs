// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! TCP headers cut short by an ICMP error payload.
//!
//! An ICMP error only has to quote the offending packet's IP header plus the
//! first 8 bytes of its payload, so the TCP header found inside one may stop
//! anywhere after the port pair.  Translation still needs to read and rewrite
//! those ports, so this module parses whatever prefix of the header survived.

use std::num::NonZero;

use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use crate::tcp::{Tcp, TcpParseError, TcpPort};

/// The leading fragment of a TCP header.
///
/// Holds the port pair (always present, see [`TruncatedTcpHeader::parse`])
/// plus every remaining quoted byte, kept verbatim for re-serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedTcpHeader {
    source_port: TcpPort,
    destination_port: TcpPort,
    tail: Vec<u8>,
}

impl TruncatedTcpHeader {
    const PORTS_LEN: usize = 4;

    fn new(source_port: TcpPort, destination_port: TcpPort, tail: Vec<u8>) -> Self {
        Self {
            source_port,
            destination_port,
            tail,
        }
    }

    /// Number of bytes of the original header which were quoted
    #[must_use]
    pub fn header_len(&self) -> NonZero<usize> {
        NonZero::new(self.tail.len() + Self::PORTS_LEN).unwrap_or_else(|| unreachable!())
    }

    /// Get the source port
    #[must_use]
    pub const fn source(&self) -> TcpPort {
        self.source_port
    }

    /// Get the destination port
    #[must_use]
    pub const fn destination(&self) -> TcpPort {
        self.destination_port
    }

    /// Set the source port
    pub fn set_source(&mut self, source_port: TcpPort) -> &mut Self {
        self.source_port = source_port;
        self
    }

    /// Set the destination port
    pub fn set_destination(&mut self, destination_port: TcpPort) -> &mut Self {
        self.destination_port = destination_port;
        self
    }
}

impl Parse for TruncatedTcpHeader {
    type Error = TruncatedTcpError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        // RFC 792 requires an ICMP error to quote at least 64 bits of the
        // offending datagram, so a well-formed message always carries the
        // port pair.  Shorter input is an error, not a shorter header.
        if buf.len() < TruncatedTcpHeader::PORTS_LEN {
            return Err(ParseError::Length(LengthError {
                expected: NonZero::new(TruncatedTcpHeader::PORTS_LEN)
                    .unwrap_or_else(|| unreachable!()),
                actual: buf.len(),
            }));
        }
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }

        let source_port =
            TcpPort::new_checked(u16::from_be_bytes([buf[0], buf[1]])).map_err(|_| {
                ParseError::Invalid(TruncatedTcpError::TcpParseError(
                    TcpParseError::ZeroSourcePort,
                ))
            })?;
        let destination_port =
            TcpPort::new_checked(u16::from_be_bytes([buf[2], buf[3]])).map_err(|_| {
                ParseError::Invalid(TruncatedTcpError::TcpParseError(
                    TcpParseError::ZeroDestinationPort,
                ))
            })?;

        // non-zero and bounded by u16::MAX above
        #[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
        let consumed = NonZero::new(buf.len() as u16).unwrap();

        let parsed = Self::new(source_port, destination_port, buf[4..].to_vec());
        Ok((parsed, consumed))
    }
}

impl DeParse for TruncatedTcpHeader {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        let size_u16 = u16::try_from(self.header_len().get()).unwrap_or_else(|_| unreachable!());
        NonZero::new(size_u16).unwrap_or_else(|| unreachable!())
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        let header_len = self.header_len().get();
        if buf.len() < header_len {
            return Err(DeParseError::Length(LengthError {
                expected: self.header_len(),
                actual: buf.len(),
            }));
        }
        buf[0..2].copy_from_slice(&self.source_port.as_u16().to_be_bytes());
        buf[2..4].copy_from_slice(&self.destination_port.as_u16().to_be_bytes());
        buf[4..header_len].copy_from_slice(&self.tail);
        Ok(self.size())
    }
}

/// A quoted TCP header which may or may not be complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncatedTcp {
    /// All 20+ bytes of the header were quoted
    FullHeader(Tcp),
    /// The quote stopped short of a complete header
    PartialHeader(TruncatedTcpHeader),
}

impl TruncatedTcp {
    /// Get the source port
    #[must_use]
    pub const fn source(&self) -> TcpPort {
        match self {
            TruncatedTcp::FullHeader(tcp) => tcp.source(),
            TruncatedTcp::PartialHeader(tcp) => tcp.source(),
        }
    }

    /// Get the destination port
    #[must_use]
    pub const fn destination(&self) -> TcpPort {
        match self {
            TruncatedTcp::FullHeader(tcp) => tcp.destination(),
            TruncatedTcp::PartialHeader(tcp) => tcp.destination(),
        }
    }

    /// Set the source port
    pub fn set_source(&mut self, port: TcpPort) {
        match self {
            TruncatedTcp::FullHeader(tcp) => {
                tcp.set_source(port);
            }
            TruncatedTcp::PartialHeader(tcp) => {
                tcp.set_source(port);
            }
        }
    }

    /// Set the destination port
    pub fn set_destination(&mut self, port: TcpPort) {
        match self {
            TruncatedTcp::FullHeader(tcp) => {
                tcp.set_destination(port);
            }
            TruncatedTcp::PartialHeader(tcp) => {
                tcp.set_destination(port);
            }
        }
    }

    /// Returns `true` if the full 20+ byte header was present.
    ///
    /// Only a full header has a meaningful checksum field.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, TruncatedTcp::FullHeader(_))
    }
}

/// Errors which can occur when attempting to parse arbitrary bytes into a [`TruncatedTcp`] header.
#[derive(Debug, thiserror::Error)]
pub enum TruncatedTcpError {
    /// A transparent error from [`Tcp::parse`].
    #[error(transparent)]
    TcpParseError(TcpParseError),
}

impl Parse for TruncatedTcp {
    type Error = TruncatedTcpError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        match Tcp::parse(buf) {
            Ok((tcp, consumed)) => Ok((TruncatedTcp::FullHeader(tcp), consumed)),
            Err(ParseError::BufferTooLong(len)) => Err(ParseError::BufferTooLong(len)),
            Err(ParseError::Invalid(e)) => {
                Err(ParseError::Invalid(TruncatedTcpError::TcpParseError(e)))
            }
            // too short for a complete header: fall back to the leading fragment
            Err(ParseError::Length(_)) => {
                let (header, consumed) = TruncatedTcpHeader::parse(buf)?;
                Ok((TruncatedTcp::PartialHeader(header), consumed))
            }
        }
    }
}

impl DeParse for TruncatedTcp {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        match self {
            TruncatedTcp::FullHeader(tcp) => tcp.size(),
            TruncatedTcp::PartialHeader(tcp) => tcp.size(),
        }
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        match self {
            TruncatedTcp::FullHeader(tcp) => tcp.deparse(buf),
            TruncatedTcp::PartialHeader(tcp) => tcp.deparse(buf),
        }
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use super::{Tcp, TruncatedTcp, TruncatedTcpHeader};
    use crate::parse::{DeParse, Parse};
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for TruncatedTcp {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let full_header = TruncatedTcp::FullHeader(driver.produce()?);
            if driver.produce::<bool>()? {
                Some(full_header)
            } else {
                let mut buffer = [0u8; Tcp::MIN_LEN.get() as usize];
                #[allow(clippy::unwrap_used)] // We want to catch errors when deparsing, if any
                full_header.deparse(&mut buffer).unwrap();

                // quote lengths of 4..=19 exercise every truncation point
                let size = driver.produce::<u8>()? % 16 + 4;
                #[allow(clippy::unwrap_used)] // We want to catch errors when parsing, if any
                let tcp = TruncatedTcpHeader::parse(&buffer[..size as usize]).unwrap().0;

                Some(TruncatedTcp::PartialHeader(tcp))
            }
        }
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use crate::parse::{DeParse, IntoNonZeroUSize, Parse};
    use crate::tcp::truncated::TruncatedTcp;

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn parse_back() {
        bolero::check!().with_type().for_each(|header: &TruncatedTcp| {
            let mut buffer = [0u8; 64];
            let written = header.deparse(&mut buffer).unwrap();
            let (parsed, consumed) =
                TruncatedTcp::parse(&buffer[..written.into_non_zero_usize().get()]).unwrap();
            assert_eq!(header, &parsed);
            assert_eq!(written, consumed);
            assert_eq!(header.is_full(), consumed.get() >= 20);
        });
    }
}
