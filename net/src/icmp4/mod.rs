// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ICMPv4` header type and logic.

pub mod checksum;
mod truncated;

use crate::parse::{DeParse, DeParseError, IntoNonZeroUSize, LengthError, Parse, ParseError};
use etherparse::{Icmpv4Header, Icmpv4Type};
use std::num::NonZero;

pub use checksum::Icmp4Checksum;
pub use truncated::{TruncatedIcmp4, TruncatedIcmp4Header};

/// An `ICMPv4` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmp4(pub(crate) Icmpv4Header);

impl Icmp4 {
    /// The minimum length (in bytes) of an [`Icmp4`] header
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const MIN_LEN: NonZero<u16> = NonZero::new(8).unwrap();

    /// Create an [`Icmp4`] from an [`Icmpv4Type`]; the checksum starts at zero.
    #[must_use]
    pub fn new(icmp_type: Icmpv4Type) -> Self {
        Self(Icmpv4Header::new(icmp_type))
    }

    /// Get the message type and code of this header
    #[must_use]
    pub fn kind(&self) -> &Icmpv4Type {
        &self.0.icmp_type
    }

    /// Get the raw message type
    #[must_use]
    pub fn type_u8(&self) -> u8 {
        // Icmpv4Type has no raw accessors; read the serialized header instead
        self.0.to_bytes()[0]
    }

    /// Get the raw message code
    #[must_use]
    pub fn code_u8(&self) -> u8 {
        self.0.to_bytes()[1]
    }

    /// Get the echo identifier, if this is an echo request or reply
    #[must_use]
    pub fn echo_id(&self) -> Option<u16> {
        match &self.0.icmp_type {
            Icmpv4Type::EchoRequest(echo) | Icmpv4Type::EchoReply(echo) => Some(echo.id),
            _ => None,
        }
    }

    /// Returns `true` if this message type carries an embedded original packet
    /// which translation must rewrite (RFC 792 error messages).
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self.0.icmp_type,
            Icmpv4Type::DestinationUnreachable(_)
                | Icmpv4Type::TimeExceeded(_)
                | Icmpv4Type::ParameterProblem(_)
        )
    }
}

impl Parse for Icmp4 {
    type Error = LengthError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>> {
        if buf.len() > usize::from(u16::MAX) {
            return Err(ParseError::BufferTooLong(buf.len()));
        }
        let (inner, rest) = Icmpv4Header::from_slice(buf).map_err(|e| {
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
        Ok((Self(inner), consumed))
    }
}

impl DeParse for Icmp4 {
    type Error = ();

    fn size(&self) -> NonZero<u16> {
        #[allow(clippy::cast_possible_truncation)] // header has bounded size
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
    use crate::icmp4::Icmp4;
    use crate::parse::{Parse, ParseError};
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for Icmp4 {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            // 20 bytes is enough for any fixed ICMPv4 header (timestamp included)
            let buffer: [u8; 20] = driver.produce()?;
            let icmp4 = match Icmp4::parse(&buffer) {
                Ok((icmp4, _)) => icmp4,
                Err(ParseError::Length(l)) => unreachable!("{l:?}"),
                Err(e) => unreachable!("{e:?}"),
            };
            Some(icmp4)
        }
    }
}
