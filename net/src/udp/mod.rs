// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! UDP header type and manipulation

pub mod checksum;
mod port;
mod truncated;

use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use etherparse::UdpHeader;
use std::num::NonZero;

pub use checksum::UdpChecksum;
pub use port::{UdpPort, UdpPortError};
pub use truncated::{TruncatedUdp, TruncatedUdpError, TruncatedUdpHeader};

/// A UDP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Udp(pub(crate) UdpHeader);

/// Errors which can occur while parsing a [`Udp`] header
#[derive(Debug, thiserror::Error)]
pub enum UdpParseError {
    /// Zero is not a legal udp port
    #[error("zero source port")]
    ZeroSourcePort,
    /// Zero is not a legal udp port
    #[error("zero destination port")]
    ZeroDestinationPort,
}

impl Udp {
    /// The length of a UDP header (technically also the maximum length).
    /// The name choice here is for consistency with other header types.
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const MIN_LEN: NonZero<u16> = NonZero::new(8).unwrap();

    /// Get the source port
    #[must_use]
    pub const fn source(&self) -> UdpPort {
        debug_assert!(self.0.source_port != 0);
        #[allow(unsafe_code)] // non-zero checked in `Parse`
        unsafe {
            UdpPort::new_unchecked(self.0.source_port)
        }
    }

    /// Get the destination port
    #[must_use]
    pub const fn destination(&self) -> UdpPort {
        debug_assert!(self.0.destination_port != 0);
        #[allow(unsafe_code)] // non-zero checked in `Parse`
        unsafe {
            UdpPort::new_unchecked(self.0.destination_port)
        }
    }

    /// The length field (including the 8-byte udp header).
    ///
    /// No attempt is made to ensure this value is correct (you can't always
    /// trust the packet).
    #[must_use]
    pub const fn length(&self) -> u16 {
        self.0.length
    }

    /// Set the source port
    pub fn set_source(&mut self, port: UdpPort) -> &mut Self {
        self.0.source_port = port.into();
        self
    }

    /// Set the destination port
    pub fn set_destination(&mut self, port: UdpPort) -> &mut Self {
        self.0.destination_port = port.into();
        self
    }

    /// Set the length field (includes the udp header length of eight bytes).
    pub fn set_length(&mut self, length: u16) -> &mut Self {
        self.0.length = length;
        self
    }
}

impl Parse for Udp {
    type Error = UdpParseError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }
        let (inner, rest) = UdpHeader::from_slice(buf).map_err(|e| {
            ParseError::Length(LengthError {
                expected: NonZero::new(e.required_len).unwrap_or_else(|| unreachable!()),
                actual: buf.len(),
            })
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
            return Err(ParseError::Invalid(UdpParseError::ZeroSourcePort));
        }
        if inner.destination_port == 0 {
            return Err(ParseError::Invalid(UdpParseError::ZeroDestinationPort));
        }
        Ok((Self(inner), consumed))
    }
}

impl DeParse for Udp {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        Udp::MIN_LEN
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
    use crate::udp::Udp;
    use bolero::{Driver, TypeGenerator};
    use etherparse::UdpHeader;

    impl TypeGenerator for Udp {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let mut header = Udp(UdpHeader::default());
            header
                .set_source(driver.produce()?)
                .set_destination(driver.produce()?)
                .set_length(driver.produce()?);
            header.0.checksum = driver.produce()?;
            Some(header)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)] // valid in tests
#[cfg(test)]
mod test {
    use crate::parse::{DeParse, Parse, ParseError};
    use crate::udp::{Udp, UdpParseError};

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn parse_back() {
        bolero::check!().with_type().for_each(|header: &Udp| {
            let mut buffer = [0u8; 8];
            let written = header.deparse(&mut buffer).unwrap();
            assert_eq!(written.get(), 8);
            let (parsed, consumed) = Udp::parse(&buffer).unwrap();
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
                |slice: &[u8; Udp::MIN_LEN.get() as usize]| match Udp::parse(slice) {
                    Ok((parsed, consumed)) => {
                        assert_eq!(consumed.get() as usize, slice.len());
                        let mut slice2 = [0u8; 8];
                        parsed.deparse(&mut slice2).unwrap();
                        assert_eq!(slice, &slice2);
                    }
                    Err(ParseError::Invalid(UdpParseError::ZeroSourcePort)) => {
                        assert_eq!(slice[0..=1], [0, 0]);
                    }
                    Err(ParseError::Invalid(UdpParseError::ZeroDestinationPort)) => {
                        assert_eq!(slice[2..=3], [0, 0]);
                    }
                    Err(e) => unreachable!("{e:?}"),
                },
            );
    }
}
