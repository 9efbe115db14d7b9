// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ICMPv4` header type and logic, for potentially truncated datagrams.

use std::num::NonZero;

use crate::icmp4::Icmp4;
use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};

/// A truncated `ICMPv4` header.
///
/// The embedded packet of an ICMP error message may cut its transport header
/// short; only the type, code and checksum bytes are guaranteed present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedIcmp4Header {
    icmp_type: u8,
    code: u8,
    // The rest of the header, as a byte vector, for de-parsing
    everything_else: Vec<u8>,
}

impl TruncatedIcmp4Header {
    const MIN_HEADER_LEN: usize = 4;

    /// Get the length of the truncated header
    #[must_use]
    pub fn header_len(&self) -> NonZero<usize> {
        let len = self.everything_else.len() + Self::MIN_HEADER_LEN;
        NonZero::new(len).unwrap_or_else(|| unreachable!())
    }

    /// Get the raw message type
    #[must_use]
    pub const fn type_u8(&self) -> u8 {
        self.icmp_type
    }

    /// Get the raw message code
    #[must_use]
    pub const fn code_u8(&self) -> u8 {
        self.code
    }
}

impl Parse for TruncatedIcmp4Header {
    type Error = ();

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        if buf.len() < TruncatedIcmp4Header::MIN_HEADER_LEN {
            return Err(ParseError::Length(LengthError {
                expected: NonZero::new(TruncatedIcmp4Header::MIN_HEADER_LEN)
                    .unwrap_or_else(|| unreachable!()),
                actual: buf.len(),
            }));
        }
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }
        // buf.len() is always non-zero and bounded by u16::MAX above
        #[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
        let consumed = NonZero::new(buf.len() as u16).unwrap();
        let parsed = Self {
            icmp_type: buf[0],
            code: buf[1],
            everything_else: buf[2..].to_vec(),
        };
        Ok((parsed, consumed))
    }
}

impl DeParse for TruncatedIcmp4Header {
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
        buf[0] = self.icmp_type;
        buf[1] = self.code;
        buf[2..header_len].copy_from_slice(&self.everything_else);
        Ok(self.size())
    }
}

/// An `ICMPv4` header, possibly truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncatedIcmp4 {
    /// A full `ICMPv4` header
    FullHeader(Icmp4),
    /// A truncated `ICMPv4` header (< 8 bytes)
    PartialHeader(TruncatedIcmp4Header),
}

impl TruncatedIcmp4 {
    /// Get the raw message type
    #[must_use]
    pub fn type_u8(&self) -> u8 {
        match self {
            TruncatedIcmp4::FullHeader(icmp) => icmp.type_u8(),
            TruncatedIcmp4::PartialHeader(icmp) => icmp.type_u8(),
        }
    }

    /// Get the raw message code
    #[must_use]
    pub fn code_u8(&self) -> u8 {
        match self {
            TruncatedIcmp4::FullHeader(icmp) => icmp.code_u8(),
            TruncatedIcmp4::PartialHeader(icmp) => icmp.code_u8(),
        }
    }

    /// Get the echo identifier, if this is a full echo request or reply header
    #[must_use]
    pub fn echo_id(&self) -> Option<u16> {
        match self {
            TruncatedIcmp4::FullHeader(icmp) => icmp.echo_id(),
            TruncatedIcmp4::PartialHeader(_) => None,
        }
    }

    /// Returns `true` if this is itself an ICMP error message.
    ///
    /// An error embedded in an error is never translated further.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.type_u8(), 3 | 4 | 5 | 11 | 12)
    }
}

impl Parse for TruncatedIcmp4 {
    type Error = ();

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        match Icmp4::parse(buf) {
            Ok((icmp, consumed)) => Ok((TruncatedIcmp4::FullHeader(icmp), consumed)),
            Err(ParseError::BufferTooLong(len)) => Err(ParseError::BufferTooLong(len)),
            Err(ParseError::Invalid(e)) => unreachable!("{e:?}"),
            Err(ParseError::Length(_)) => {
                let (header, consumed) = TruncatedIcmp4Header::parse(buf)?;
                Ok((TruncatedIcmp4::PartialHeader(header), consumed))
            }
        }
    }
}

impl DeParse for TruncatedIcmp4 {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        match self {
            TruncatedIcmp4::FullHeader(icmp) => icmp.size(),
            TruncatedIcmp4::PartialHeader(icmp) => icmp.size(),
        }
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>> {
        match self {
            TruncatedIcmp4::FullHeader(icmp) => icmp.deparse(buf),
            TruncatedIcmp4::PartialHeader(icmp) => icmp.deparse(buf),
        }
    }
}
