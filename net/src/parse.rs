// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Traits for parsing headers from, and serializing headers back into, byte
//! buffers.

use std::fmt::Debug;
use std::num::NonZero;

/// Infallible conversion of a `NonZero<u16>` into a `NonZero<usize>`.
pub trait IntoNonZeroUSize {
    /// Convert `self` into a `NonZero<usize>`.
    fn into_non_zero_usize(self) -> NonZero<usize>;
}

impl IntoNonZeroUSize for NonZero<u16> {
    fn into_non_zero_usize(self) -> NonZero<usize> {
        NonZero::new(usize::from(self.get())).unwrap_or_else(|| unreachable!())
    }
}

/// The buffer does not contain enough bytes for the attempted operation.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
#[error("expected at least {expected} bytes, got {actual}")]
pub struct LengthError {
    /// The minimum number of bytes required.
    pub expected: NonZero<usize>,
    /// The number of bytes available.
    pub actual: usize,
}

/// Errors which may occur when parsing a header from a buffer.
#[derive(Debug, thiserror::Error)]
pub enum ParseError<E: Debug> {
    /// Packet buffers are limited to `u16::MAX` bytes.  Anything longer
    /// cannot have come off the wire.
    #[error("buffer of {0} bytes exceeds the maximum supported length")]
    BufferTooLong(usize),
    /// The buffer ends before the header does.
    #[error(transparent)]
    Length(LengthError),
    /// The bytes do not form a legal header.
    #[error(transparent)]
    Invalid(E),
}

/// Errors which may occur when serializing a header into a buffer.
#[derive(Debug, thiserror::Error)]
pub enum DeParseError<E: Debug> {
    /// Packet buffers are limited to `u16::MAX` bytes.
    #[error("buffer of {0} bytes exceeds the maximum supported length")]
    BufferTooLong(usize),
    /// The buffer is too short to hold the serialized header.
    #[error(transparent)]
    Length(LengthError),
    /// The header cannot be serialized.
    #[error(transparent)]
    Invalid(E),
}

/// Parse a header from the start of a buffer.
pub trait Parse {
    /// The error type returned when the bytes do not form a legal header.
    type Error: Debug;

    /// Parse a `Self` from the start of `buf`.
    ///
    /// Returns the parsed header and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the buffer is too short, too long, or
    /// holds an illegal header.
    fn parse(buf: &[u8]) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>>
    where
        Self: Sized;
}

/// Parse a header from the start of a buffer, with external context.
///
/// Some headers cannot be parsed from their bytes alone; e.g. the embedded
/// packet of an ICMP error message is IPv4 or IPv6 depending on the message
/// which carries it.
pub trait ParseWith {
    /// The error type returned when the bytes do not form a legal header.
    type Error: Debug;
    /// The context required to parse a `Self`.
    type Param;

    /// Parse a `Self` from the start of `buf`, steered by `param`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the buffer is too short, too long, or
    /// holds an illegal header.
    fn parse_with(
        param: Self::Param,
        buf: &[u8],
    ) -> Result<(Self, NonZero<u16>), ParseError<Self::Error>>
    where
        Self: Sized;
}

/// Serialize a header into the start of a buffer.
pub trait DeParse {
    /// The error type returned when the header cannot be serialized.
    type Error: Debug;

    /// The number of bytes required to serialize this header.
    fn size(&self) -> NonZero<u16>;

    /// Write this header to the start of `buf`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns a [`DeParseError`] if the buffer is too short to hold the
    /// serialized header.
    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<u16>, DeParseError<Self::Error>>;
}
