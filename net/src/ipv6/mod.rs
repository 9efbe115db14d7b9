// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ipv6 header type and manipulation

mod addr;
pub mod frag;

use crate::ip::NextHeader;
use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use etherparse::Ipv6Header;
use std::net::Ipv6Addr;
use std::num::NonZero;

pub use addr::UnicastIpv6Addr;
pub use frag::Ipv6Frag;

#[allow(unused_imports)] // re-export
#[cfg(any(test, feature = "bolero"))]
pub use contract::*;

/// An IPv6 header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv6(pub(crate) Ipv6Header);

/// Errors which can occur while parsing or building an [`Ipv6`] header
#[derive(Debug, thiserror::Error)]
pub enum Ipv6Error {
    /// Multicast source addresses are illegal
    #[error("multicast source address {0} is illegal")]
    InvalidSourceAddr(Ipv6Addr),
    /// The bytes do not form a legal IPv6 header
    #[error(transparent)]
    Invalid(etherparse::err::ipv6::HeaderSliceError),
}

impl Ipv6 {
    /// The length (in bytes) of an [`Ipv6`] header (extension headers are separate types)
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const MIN_LEN: NonZero<u16> = NonZero::new(40).unwrap();

    /// Create a new [`Ipv6`] header
    ///
    /// # Errors
    ///
    /// Returns an [`Ipv6Error::InvalidSourceAddr`] error if the source address is multicast.
    pub fn new(header: Ipv6Header) -> Result<Self, Ipv6Error> {
        UnicastIpv6Addr::new(Ipv6Addr::from(header.source))
            .map_err(Ipv6Error::InvalidSourceAddr)?;
        Ok(Self(header))
    }

    /// Get the source [`Ipv6Addr`] of this header
    #[must_use]
    pub fn source(&self) -> UnicastIpv6Addr {
        UnicastIpv6Addr::new(Ipv6Addr::from(self.0.source)).unwrap_or_else(|_| unreachable!())
    }

    /// Get the destination [`Ipv6Addr`] of this header
    #[must_use]
    pub fn destination(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.0.destination)
    }

    /// Get the type of the next header
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        NextHeader(self.0.next_header)
    }

    /// Get the hop limit (analogous to [`crate::ipv4::Ipv4::ttl`])
    #[must_use]
    pub const fn hop_limit(&self) -> u8 {
        self.0.hop_limit
    }

    /// Get the [traffic class] of this header
    ///
    /// [traffic class]: https://datatracker.ietf.org/doc/html/rfc8200#section-7
    #[must_use]
    pub const fn traffic_class(&self) -> u8 {
        self.0.traffic_class
    }

    /// Get the payload length field (everything after the fixed 40-byte header)
    #[must_use]
    pub const fn payload_length(&self) -> u16 {
        self.0.payload_length
    }

    /// Set the source address
    pub fn set_source(&mut self, source: UnicastIpv6Addr) -> &mut Self {
        self.0.source = source.inner().octets();
        self
    }

    /// Set the destination address
    pub fn set_destination(&mut self, destination: Ipv6Addr) -> &mut Self {
        self.0.destination = destination.octets();
        self
    }

    /// Set the next header
    pub fn set_next_header(&mut self, next_header: NextHeader) -> &mut Self {
        self.0.next_header = next_header.0;
        self
    }

    /// Set the hop limit
    pub fn set_hop_limit(&mut self, hop_limit: u8) -> &mut Self {
        self.0.hop_limit = hop_limit;
        self
    }

    /// Set the [traffic class] of this header
    ///
    /// [traffic class]: https://datatracker.ietf.org/doc/html/rfc8200#section-7
    pub fn set_traffic_class(&mut self, traffic_class: u8) -> &mut Self {
        self.0.traffic_class = traffic_class;
        self
    }

    /// Set the payload length field
    ///
    /// This method does not (and cannot) check that the length is correct in
    /// the context of the packet as a whole.
    pub fn set_payload_length(&mut self, length: u16) -> &mut Self {
        self.0
            .set_payload_length(usize::from(length))
            .unwrap_or_else(|_| unreachable!());
        self
    }
}

impl Parse for Ipv6 {
    type Error = Ipv6Error;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }
        if buf.len() < Ipv6::MIN_LEN.into_non_zero_usize().get() {
            return Err(ParseError::Length(LengthError {
                expected: Ipv6::MIN_LEN.into_non_zero_usize(),
                actual: buf.len(),
            }));
        }
        let (header, rest) = Ipv6Header::from_slice(buf)
            .map_err(|e| ParseError::Invalid(Ipv6Error::Invalid(e)))?;
        assert!(
            rest.len() < buf.len(),
            "rest.len() >= buf.len() ({rest} >= {buf})",
            rest = rest.len(),
            buf = buf.len()
        );
        #[allow(clippy::cast_possible_truncation)] // buf.len() bounded by u16::MAX above
        let consumed =
            NonZero::new((buf.len() - rest.len()) as u16).ok_or_else(|| unreachable!())?;
        Ok((Self::new(header).map_err(ParseError::Invalid)?, consumed))
    }
}

impl DeParse for Ipv6 {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        Ipv6::MIN_LEN
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
    use crate::ip::NextHeader;
    use crate::ipv6::{Ipv6, UnicastIpv6Addr};
    use bolero::{Driver, TypeGenerator, ValueGenerator};
    use etherparse::Ipv6Header;
    use std::net::Ipv6Addr;

    /// Generate an (otherwise arbitrary) [`Ipv6`] header with the supplied [`NextHeader`].
    pub struct GenWithNextHeader(pub NextHeader);

    impl ValueGenerator for GenWithNextHeader {
        type Output = Ipv6;

        fn generate<D: Driver>(&self, driver: &mut D) -> Option<Ipv6> {
            let mut header = Ipv6(Ipv6Header::default());
            header
                .set_source(driver.produce::<UnicastIpv6Addr>()?)
                .set_destination(Ipv6Addr::from(driver.produce::<u128>()?))
                .set_next_header(self.0)
                .set_payload_length(driver.produce()?)
                .set_hop_limit(driver.produce()?)
                .set_traffic_class(driver.produce()?);
            Some(header)
        }
    }

    impl TypeGenerator for Ipv6 {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            GenWithNextHeader(driver.produce()?).generate(driver)
        }
    }
}
