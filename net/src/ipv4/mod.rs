// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ipv4 header type and manipulation

mod addr;
mod checksum;
pub mod dscp;
pub mod ecn;
pub mod frag_offset;

use crate::ip::NextHeader;
use crate::ipv4::dscp::Dscp;
use crate::ipv4::ecn::Ecn;
use crate::ipv4::frag_offset::FragOffset;
use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use etherparse::err::ipv4::HeaderSliceError;
use etherparse::{IpNumber, Ipv4Header};
use std::net::Ipv4Addr;
use std::num::NonZero;

pub use addr::UnicastIpv4Addr;
pub use checksum::Ipv4Checksum;

#[allow(unused_imports)] // re-export
#[cfg(any(test, feature = "bolero"))]
pub use contract::*;

/// An IPv4 header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv4(pub(crate) Ipv4Header);

/// Errors which can occur while parsing or building an [`Ipv4`] header
#[derive(Debug, thiserror::Error)]
pub enum Ipv4Error {
    /// Multicast source addresses are illegal
    #[error("multicast source address {0} is illegal")]
    InvalidSourceAddr(Ipv4Addr),
    /// The bytes do not form a legal IPv4 header
    #[error(transparent)]
    Invalid(etherparse::err::ipv4::HeaderError),
}

/// The total length field cannot represent a payload of the requested size
#[derive(Debug, thiserror::Error)]
#[error("payload of {0} bytes does not fit in an IPv4 total length field")]
pub struct Ipv4PayloadTooLong(pub usize);

impl Ipv4 {
    /// The minimum length (in bytes) of an [`Ipv4`] header
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const MIN_LEN: NonZero<u16> = NonZero::new(20).unwrap();

    /// The maximum length (in bytes) of an [`Ipv4`] header
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const MAX_LEN: NonZero<u16> = NonZero::new(60).unwrap();

    /// Create a new [`Ipv4`] header
    ///
    /// # Errors
    ///
    /// Returns an [`Ipv4Error::InvalidSourceAddr`] error if the source address is multicast.
    pub fn new(header: Ipv4Header) -> Result<Self, Ipv4Error> {
        UnicastIpv4Addr::new(Ipv4Addr::from(header.source))
            .map_err(Ipv4Error::InvalidSourceAddr)?;
        Ok(Self(header))
    }

    /// Get the source [`Ipv4Addr`] of this header
    #[must_use]
    pub fn source(&self) -> UnicastIpv4Addr {
        UnicastIpv4Addr::new(Ipv4Addr::from(self.0.source)).unwrap_or_else(|_| unreachable!())
    }

    /// Get the destination [`Ipv4Addr`] of this header
    #[must_use]
    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.destination)
    }

    /// Get the protocol of the payload
    #[must_use]
    pub fn protocol(&self) -> NextHeader {
        NextHeader(self.0.protocol)
    }

    /// Get the header length in bytes (including options)
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }

    /// Get the total length field (header plus payload, in bytes)
    #[must_use]
    pub const fn total_len(&self) -> u16 {
        self.0.total_len
    }

    /// Get the time-to-live of this header
    #[must_use]
    pub const fn ttl(&self) -> u8 {
        self.0.time_to_live
    }

    /// Get the [`Dscp`] of this header
    #[must_use]
    pub const fn dscp(&self) -> Dscp {
        Dscp(self.0.dscp)
    }

    /// Get the [`Ecn`] of this header
    #[must_use]
    pub const fn ecn(&self) -> Ecn {
        Ecn(self.0.ecn)
    }

    /// Get the don't-fragment flag
    #[must_use]
    pub const fn dont_fragment(&self) -> bool {
        self.0.dont_fragment
    }

    /// Get the more-fragments flag
    #[must_use]
    pub const fn more_fragments(&self) -> bool {
        self.0.more_fragments
    }

    /// Get the fragment offset of this header
    #[must_use]
    pub const fn fragment_offset(&self) -> FragOffset {
        FragOffset(self.0.fragment_offset)
    }

    /// Get the identification field of this header
    #[must_use]
    pub const fn identification(&self) -> u16 {
        self.0.identification
    }

    /// Returns `true` if the offset or the more-fragments flag is non-zero
    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        self.0.more_fragments || self.0.fragment_offset.value() != 0
    }

    /// Set the source address
    pub fn set_source(&mut self, source: UnicastIpv4Addr) -> &mut Self {
        self.0.source = source.inner().octets();
        self
    }

    /// Set the destination address
    pub fn set_destination(&mut self, destination: Ipv4Addr) -> &mut Self {
        self.0.destination = destination.octets();
        self
    }

    /// Set the time-to-live
    pub fn set_ttl(&mut self, ttl: u8) -> &mut Self {
        self.0.time_to_live = ttl;
        self
    }

    /// Set the protocol of the payload
    pub fn set_protocol(&mut self, protocol: NextHeader) -> &mut Self {
        self.0.protocol = protocol.into();
        self
    }

    /// Set the [`Dscp`] of this header
    pub fn set_dscp(&mut self, dscp: Dscp) -> &mut Self {
        self.0.dscp = dscp.0;
        self
    }

    /// Set the [`Ecn`] of this header
    pub fn set_ecn(&mut self, ecn: Ecn) -> &mut Self {
        self.0.ecn = ecn.0;
        self
    }

    /// Set the identification field
    pub fn set_identification(&mut self, id: u16) -> &mut Self {
        self.0.identification = id;
        self
    }

    /// Set the don't-fragment flag
    pub fn set_dont_fragment(&mut self, dont_fragment: bool) -> &mut Self {
        self.0.dont_fragment = dont_fragment;
        self
    }

    /// Set the more-fragments flag
    pub fn set_more_fragments(&mut self, more_fragments: bool) -> &mut Self {
        self.0.more_fragments = more_fragments;
        self
    }

    /// Set the fragment offset
    pub fn set_fragment_offset(&mut self, offset: FragOffset) -> &mut Self {
        self.0.fragment_offset = offset.0;
        self
    }

    /// Set the total length field to cover a payload of `payload_len` bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the header plus payload does not fit in the 16-bit
    /// total length field.
    pub fn set_payload_len(&mut self, payload_len: usize) -> Result<&mut Self, Ipv4PayloadTooLong> {
        self.0
            .set_payload_len(payload_len)
            .map_err(|_| Ipv4PayloadTooLong(payload_len))?;
        Ok(self)
    }
}

impl Parse for Ipv4 {
    type Error = Ipv4Error;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }
        let (inner, rest) = Ipv4Header::from_slice(buf).map_err(|e| match e {
            HeaderSliceError::Len(l) => ParseError::Length(LengthError {
                expected: NonZero::new(l.required_len).unwrap_or_else(|| unreachable!()),
                actual: buf.len(),
            }),
            HeaderSliceError::Content(content) => {
                ParseError::Invalid(Ipv4Error::Invalid(content))
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
        let parsed = Self::new(inner).map_err(ParseError::Invalid)?;
        Ok((parsed, consumed))
    }
}

impl DeParse for Ipv4 {
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
    use crate::ip::NextHeader;
    use crate::ipv4::{Dscp, Ecn, FragOffset, Ipv4, UnicastIpv4Addr};
    use bolero::{Driver, TypeGenerator, ValueGenerator};
    use etherparse::Ipv4Header;

    fn generate_base<D: Driver>(driver: &mut D) -> Option<Ipv4> {
        let mut header = Ipv4(Ipv4Header::default());
        header
            .set_source(driver.produce::<UnicastIpv4Addr>()?)
            .set_destination(driver.produce::<u32>()?.into())
            .set_ttl(driver.produce()?)
            .set_dscp(driver.produce::<Dscp>()?)
            .set_ecn(driver.produce::<Ecn>()?)
            .set_identification(driver.produce()?)
            .set_dont_fragment(driver.produce()?)
            .set_more_fragments(driver.produce()?)
            .set_fragment_offset(driver.produce::<FragOffset>()?);
        header.0.total_len = driver.produce()?;
        Some(header)
    }

    impl TypeGenerator for Ipv4 {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let mut header = generate_base(driver)?;
            header.0.protocol = NextHeader::generate(driver)?.into();
            Some(header)
        }
    }

    /// Generate an [`Ipv4`] header with the supplied [`NextHeader`] as protocol.
    pub struct GenWithNextHeader(pub NextHeader);

    impl ValueGenerator for GenWithNextHeader {
        type Output = Ipv4;

        fn generate<D: Driver>(&self, driver: &mut D) -> Option<Ipv4> {
            let mut header = generate_base(driver)?;
            header.0.protocol = self.0.into();
            Some(header)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)] // valid in tests
#[cfg(test)]
mod test {
    use crate::parse::{DeParse, IntoNonZeroUSize, Parse, ParseError};
    use crate::ipv4::Ipv4;

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn parse_back() {
        bolero::check!().with_type().for_each(|header: &Ipv4| {
            let mut buffer = [0u8; 64];
            let consumed = match header.deparse(&mut buffer) {
                Ok(consumed) => consumed,
                Err(err) => unreachable!("failed to write ipv4 header: {err:?}"),
            };
            let (parsed, consumed2) =
                Ipv4::parse(&buffer[..consumed.into_non_zero_usize().get()]).unwrap();
            assert_eq!(header, &parsed);
            assert_eq!(consumed, consumed2);
        });
    }

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn parse_arbitrary_bytes() {
        bolero::check!()
            .with_type()
            .for_each(|slice: &[u8; Ipv4::MIN_LEN.get() as usize]| {
                match Ipv4::parse(slice) {
                    Ok((parsed, consumed)) => {
                        assert_eq!(consumed.get(), 20);
                        assert!(!parsed.source().inner().is_multicast());
                    }
                    Err(ParseError::Length(e)) => {
                        // options claim more bytes than the buffer holds
                        assert!(e.expected.get() > slice.len());
                    }
                    Err(ParseError::Invalid(_)) => {}
                    Err(ParseError::BufferTooLong(_)) => {
                        unreachable!("20-byte buffer flagged as too long")
                    }
                }
            });
    }
}
