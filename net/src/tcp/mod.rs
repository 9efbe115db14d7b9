// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! TCP header type and manipulation

pub mod checksum;
mod port;
mod truncated;

use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use etherparse::TcpHeader;
use etherparse::err::tcp::HeaderSliceError;
use std::num::NonZero;

pub use checksum::TcpChecksum;
pub use port::{TcpPort, TcpPortError};
pub use truncated::{TruncatedTcp, TruncatedTcpError, TruncatedTcpHeader};

/// A TCP header.
///
/// Translation never alters anything here except the checksum; the type
/// exists to validate the header and find the checksum field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tcp(pub(crate) TcpHeader);

/// Errors which can occur while parsing a [`Tcp`] header
#[derive(Debug, thiserror::Error)]
pub enum TcpParseError {
    /// Zero is not a legal tcp port
    #[error("zero source port")]
    ZeroSourcePort,
    /// Zero is not a legal tcp port
    #[error("zero destination port")]
    ZeroDestinationPort,
    /// The bytes do not form a legal TCP header
    #[error(transparent)]
    Invalid(etherparse::err::tcp::HeaderError),
}

impl Tcp {
    /// The minimum length (in bytes) of a [`Tcp`] header
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const MIN_LEN: NonZero<u16> = NonZero::new(20).unwrap();

    /// Get the source port
    #[must_use]
    pub const fn source(&self) -> TcpPort {
        debug_assert!(self.0.source_port != 0);
        #[allow(unsafe_code)] // non-zero checked in `Parse`
        unsafe {
            TcpPort::new_unchecked(self.0.source_port)
        }
    }

    /// Get the destination port
    #[must_use]
    pub const fn destination(&self) -> TcpPort {
        debug_assert!(self.0.destination_port != 0);
        #[allow(unsafe_code)] // non-zero checked in `Parse`
        unsafe {
            TcpPort::new_unchecked(self.0.destination_port)
        }
    }

    /// Get the header length in bytes (including options)
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }

    /// Set the source port
    pub fn set_source(&mut self, port: TcpPort) -> &mut Self {
        self.0.source_port = port.into();
        self
    }

    /// Set the destination port
    pub fn set_destination(&mut self, port: TcpPort) -> &mut Self {
        self.0.destination_port = port.into();
        self
    }
}

impl Parse for Tcp {
    type Error = TcpParseError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }
        let (inner, rest) = TcpHeader::from_slice(buf).map_err(|e| match e {
            HeaderSliceError::Len(l) => ParseError::Length(LengthError {
                expected: NonZero::new(l.required_len).unwrap_or_else(|| unreachable!()),
                actual: buf.len(),
            }),
            HeaderSliceError::Content(content) => {
                ParseError::Invalid(TcpParseError::Invalid(content))
            }
        })?;
        assert!(
            rest.len() < buf.len(),
            "rest.len() >= buf.len() ({rest} >= {buf})",
            rest = rest.len(),
            buf = buf.len()
        );
        #[allow(clippy::cast_possible_truncation)] // buf.len() bounded by u16::MAX above
        let consumed =
            NonZero::new((buf.len() - rest.len()) as u16).ok_or_else(|| unreachable!())?;
        if inner.source_port == 0 {
            return Err(ParseError::Invalid(TcpParseError::ZeroSourcePort));
        }
        if inner.destination_port == 0 {
            return Err(ParseError::Invalid(TcpParseError::ZeroDestinationPort));
        }
        Ok((Self(inner), consumed))
    }
}

impl DeParse for Tcp {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        #[allow(clippy::cast_possible_truncation)] // header_len is at most 60
        NonZero::new(self.0.header_len() as u16).unwrap_or_else(|| unreachable!())
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        let len = buf.len();
        if len < self.size().into_non_zero_usize().get() {
            return Err(DeParseError::Length(LengthError {
                expected: self.size().into_non_zero_usize(),
                actual: len,
            }));
        }
        buf[..self.size().into_non_zero_usize().get()].copy_from_slice(&self.0.to_bytes());
        Ok(self.size())
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::tcp::Tcp;
    use bolero::{Driver, TypeGenerator};
    use etherparse::TcpHeader;

    impl TypeGenerator for Tcp {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let mut header = Tcp(TcpHeader::default());
            header.set_source(driver.produce()?);
            header.set_destination(driver.produce()?);
            header.0.sequence_number = driver.produce()?;
            header.0.acknowledgment_number = driver.produce()?;
            header.0.window_size = driver.produce()?;
            header.0.checksum = driver.produce()?;
            header.0.ack = driver.produce()?;
            header.0.syn = driver.produce()?;
            header.0.fin = driver.produce()?;
            Some(header)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)] // valid in tests
#[cfg(test)]
mod test {
    use crate::parse::{DeParse, IntoNonZeroUSize, Parse, ParseError};
    use crate::tcp::{Tcp, TcpParseError};

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn parse_back() {
        bolero::check!().with_type().for_each(|header: &Tcp| {
            let mut buffer = [0u8; 60];
            let written = header.deparse(&mut buffer).unwrap();
            let (parsed, consumed) =
                Tcp::parse(&buffer[..written.into_non_zero_usize().get()]).unwrap();
            assert_eq!(header, &parsed);
            assert_eq!(written, consumed);
        });
    }

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn parse_arbitrary_bytes() {
        bolero::check!()
            .with_type()
            .for_each(
                |slice: &[u8; Tcp::MIN_LEN.get() as usize]| match Tcp::parse(slice) {
                    Ok((parsed, _)) => {
                        assert_ne!(parsed.source().as_u16(), 0);
                        assert_ne!(parsed.destination().as_u16(), 0);
                    }
                    Err(ParseError::Invalid(TcpParseError::ZeroSourcePort)) => {
                        assert_eq!(slice[0..=1], [0, 0]);
                    }
                    Err(ParseError::Invalid(TcpParseError::ZeroDestinationPort)) => {
                        assert_eq!(slice[2..=3], [0, 0]);
                    }
                    Err(ParseError::Invalid(TcpParseError::Invalid(_))) => {
                        // data offset below 5
                        assert!(slice[12] >> 4 < 5);
                    }
                    Err(ParseError::Length(e)) => {
                        // options claim more bytes than the buffer holds
                        assert!(e.expected.get() > slice.len());
                    }
                    Err(ParseError::BufferTooLong(_)) => {
                        unreachable!("20-byte buffer flagged as too long")
                    }
                },
            );
    }
}
