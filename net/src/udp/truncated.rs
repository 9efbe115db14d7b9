// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! UDP headers cut short by an ICMP error payload.
//!
//! An ICMP error only has to quote the offending packet's IP header plus the
//! first 8 bytes of its payload, so the UDP header found inside one may stop
//! anywhere after the port pair.  Translation still needs to read and rewrite
//! those ports, so this module parses whatever prefix of the header survived.

use std::num::NonZero;

use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use crate::udp::{Udp, UdpParseError, UdpPort};

/// The leading fragment of a UDP header.
///
/// Holds the port pair (always present, see [`TruncatedUdpHeader::parse`])
/// plus every remaining quoted byte, kept verbatim for re-serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedUdpHeader {
    source_port: UdpPort,
    destination_port: UdpPort,
    tail: Vec<u8>,
}

impl TruncatedUdpHeader {
    const PORTS_LEN: usize = 4;

    fn new(source_port: UdpPort, destination_port: UdpPort, tail: Vec<u8>) -> Self {
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
    pub const fn source(&self) -> UdpPort {
        self.source_port
    }

    /// Get the destination port
    #[must_use]
    pub const fn destination(&self) -> UdpPort {
        self.destination_port
    }

    /// Set the source port
    pub fn set_source(&mut self, source_port: UdpPort) -> &mut Self {
        self.source_port = source_port;
        self
    }

    /// Set the destination port
    pub fn set_destination(&mut self, destination_port: UdpPort) -> &mut Self {
        self.destination_port = destination_port;
        self
    }
}

impl Parse for TruncatedUdpHeader {
    type Error = TruncatedUdpError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        // RFC 792 requires an ICMP error to quote at least 64 bits of the
        // offending datagram, so a well-formed message always carries the
        // port pair.  Shorter input is an error, not a shorter header.
        if buf.len() < TruncatedUdpHeader::PORTS_LEN {
            return Err(ParseError::Length(LengthError {
                expected: NonZero::new(TruncatedUdpHeader::PORTS_LEN)
                    .unwrap_or_else(|| unreachable!()),
                actual: buf.len(),
            }));
        }
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }

        let source_port =
            UdpPort::new_checked(u16::from_be_bytes([buf[0], buf[1]])).map_err(|_| {
                ParseError::Invalid(TruncatedUdpError::UdpParseError(
                    UdpParseError::ZeroSourcePort,
                ))
            })?;
        let destination_port =
            UdpPort::new_checked(u16::from_be_bytes([buf[2], buf[3]])).map_err(|_| {
                ParseError::Invalid(TruncatedUdpError::UdpParseError(
                    UdpParseError::ZeroDestinationPort,
                ))
            })?;

        // non-zero and bounded by u16::MAX above
        #[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
        let consumed = NonZero::new(buf.len() as u16).unwrap();

        let parsed = Self::new(source_port, destination_port, buf[4..].to_vec());
        Ok((parsed, consumed))
    }
}

impl DeParse for TruncatedUdpHeader {
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

/// A quoted UDP header which may or may not be complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncatedUdp {
    /// All 8 bytes of the header were quoted
    FullHeader(Udp),
    /// The quote stopped short of a complete header
    PartialHeader(TruncatedUdpHeader),
}

impl TruncatedUdp {
    /// Get the source port
    #[must_use]
    pub const fn source(&self) -> UdpPort {
        match self {
            TruncatedUdp::FullHeader(udp) => udp.source(),
            TruncatedUdp::PartialHeader(udp) => udp.source(),
        }
    }

    /// Get the destination port
    #[must_use]
    pub const fn destination(&self) -> UdpPort {
        match self {
            TruncatedUdp::FullHeader(udp) => udp.destination(),
            TruncatedUdp::PartialHeader(udp) => udp.destination(),
        }
    }

    /// Set the source port
    pub fn set_source(&mut self, port: UdpPort) {
        match self {
            TruncatedUdp::FullHeader(udp) => {
                udp.set_source(port);
            }
            TruncatedUdp::PartialHeader(udp) => {
                udp.set_source(port);
            }
        }
    }

    /// Set the destination port
    pub fn set_destination(&mut self, port: UdpPort) {
        match self {
            TruncatedUdp::FullHeader(udp) => {
                udp.set_destination(port);
            }
            TruncatedUdp::PartialHeader(udp) => {
                udp.set_destination(port);
            }
        }
    }

    /// Returns `true` if the full 8-byte header was present.
    ///
    /// Only a full header has a meaningful checksum field.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, TruncatedUdp::FullHeader(_))
    }
}

/// Errors which can occur when attempting to parse arbitrary bytes into a [`TruncatedUdp`] header.
#[derive(Debug, thiserror::Error)]
pub enum TruncatedUdpError {
    /// A transparent error from [`Udp::parse`].
    #[error(transparent)]
    UdpParseError(UdpParseError),
}

impl Parse for TruncatedUdp {
    type Error = TruncatedUdpError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        match Udp::parse(buf) {
            Ok((udp, consumed)) => Ok((TruncatedUdp::FullHeader(udp), consumed)),
            Err(ParseError::BufferTooLong(len)) => Err(ParseError::BufferTooLong(len)),
            Err(ParseError::Invalid(e)) => {
                Err(ParseError::Invalid(TruncatedUdpError::UdpParseError(e)))
            }
            // too short for a complete header: fall back to the leading fragment
            Err(ParseError::Length(_)) => {
                let (header, consumed) = TruncatedUdpHeader::parse(buf)?;
                Ok((TruncatedUdp::PartialHeader(header), consumed))
            }
        }
    }
}

impl DeParse for TruncatedUdp {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        match self {
            TruncatedUdp::FullHeader(udp) => udp.size(),
            TruncatedUdp::PartialHeader(udp) => udp.size(),
        }
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        match self {
            TruncatedUdp::FullHeader(udp) => udp.deparse(buf),
            TruncatedUdp::PartialHeader(udp) => udp.deparse(buf),
        }
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use super::{TruncatedUdp, TruncatedUdpHeader, Udp};
    use crate::parse::{DeParse, Parse};
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for TruncatedUdp {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let full_header = TruncatedUdp::FullHeader(driver.produce()?);
            if driver.produce::<bool>()? {
                Some(full_header)
            } else {
                let mut buffer = [0u8; Udp::MIN_LEN.get() as usize];
                #[allow(clippy::unwrap_used)] // We want to catch errors when deparsing, if any
                full_header.deparse(&mut buffer).unwrap();

                // quote lengths of 4..=7 exercise every truncation point
                let size = driver.produce::<u8>()? % 4 + 4;
                #[allow(clippy::unwrap_used)] // We want to catch errors when parsing, if any
                let udp = TruncatedUdpHeader::parse(&buffer[..size as usize]).unwrap().0;

                Some(TruncatedUdp::PartialHeader(udp))
            }
        }
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use crate::parse::{DeParse, IntoNonZeroUSize, Parse};
    use crate::udp::truncated::TruncatedUdp;

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn parse_back() {
        bolero::check!().with_type().for_each(|header: &TruncatedUdp| {
            let mut buffer = [0u8; 8];
            let written = header.deparse(&mut buffer).unwrap();
            let (parsed, consumed) =
                TruncatedUdp::parse(&buffer[..written.into_non_zero_usize().get()]).unwrap();
            assert_eq!(header, &parsed);
            assert_eq!(written, consumed);
            assert_eq!(header.is_full(), consumed.get() >= 8);
        });
    }
}
