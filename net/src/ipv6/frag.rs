// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv6 fragment extension header (RFC 8200 §4.5).
//!
//! The only extension header the translation engine interprets.  An "atomic"
//! fragment (offset zero, more-fragments clear) carries a complete payload
//! and exists purely to convey an identification value.

use crate::ip::NextHeader;
use crate::ipv4::frag_offset::FragOffset;
use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use etherparse::Ipv6FragmentHeader;
use std::num::NonZero;

/// An IPv6 fragment extension header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Frag(pub(crate) Ipv6FragmentHeader);

impl Ipv6Frag {
    /// The length (in bytes) of a fragment extension header.
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const LEN: NonZero<u16> = NonZero::new(8).unwrap();

    /// Create a fragment header from its field values.
    #[must_use]
    pub fn new(
        next_header: NextHeader,
        offset: FragOffset,
        more_fragments: bool,
        identification: u32,
    ) -> Self {
        Self(Ipv6FragmentHeader::new(
            next_header.into(),
            offset.0,
            more_fragments,
            identification,
        ))
    }

    /// Get the protocol of the (reassembled) payload
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        NextHeader(self.0.next_header)
    }

    /// Get the fragment offset, in units of 8 bytes
    #[must_use]
    pub const fn fragment_offset(&self) -> FragOffset {
        FragOffset(self.0.fragment_offset)
    }

    /// Get the more-fragments flag
    #[must_use]
    pub const fn more_fragments(&self) -> bool {
        self.0.more_fragments
    }

    /// Get the 32-bit fragment identification
    #[must_use]
    pub const fn identification(&self) -> u32 {
        self.0.identification
    }

    /// Returns `true` if the payload is actually fragmented.
    ///
    /// An atomic fragment (offset zero, more-fragments clear) returns `false`.
    #[must_use]
    pub const fn is_fragmenting_payload(&self) -> bool {
        self.0.more_fragments || self.0.fragment_offset.value() != 0
    }

    /// Returns `true` if this fragment carries the start of the original payload.
    #[must_use]
    pub const fn is_first_fragment(&self) -> bool {
        self.0.fragment_offset.value() == 0
    }
}

impl Parse for Ipv6Frag {
    type Error = ();

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }
        let (header, rest) = Ipv6FragmentHeader::from_slice(buf).map_err(|_| {
            ParseError::Length(LengthError {
                expected: Ipv6Frag::LEN.into_non_zero_usize(),
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
        Ok((Self(header), consumed))
    }
}

impl DeParse for Ipv6Frag {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        Ipv6Frag::LEN
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
    use crate::ipv6::frag::Ipv6Frag;
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for Ipv6Frag {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(Ipv6Frag::new(
                driver.produce()?,
                driver.produce()?,
                driver.produce()?,
                driver.produce()?,
            ))
        }
    }
}
