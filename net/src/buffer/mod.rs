// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Abstractions over packet buffers.
//!
//! Header translation reshapes packets in place: the old network header is
//! trimmed from the front, a new one of a different size is prepended, and
//! embedded packets may grow or shrink at the tail.  These traits describe
//! the minimal buffer contract the engine needs to do that without copying
//! payloads.

mod heap_buffer;
#[cfg(any(test, feature = "test_buffer"))]
mod test_buffer;

pub use heap_buffer::{HeapBuffer, PacketTooLong};
#[cfg(any(test, feature = "test_buffer"))]
pub use test_buffer::TestBuffer;

/// The buffer does not have enough headroom to prepend the requested bytes.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
#[error("not enough headroom: requested {requested}, available {available}")]
#[non_exhaustive]
pub struct NotEnoughHeadRoom {
    /// The number of bytes requested.
    pub requested: u16,
    /// The number of bytes available.
    pub available: u16,
}

/// The buffer does not have enough tailroom to append the requested bytes.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
#[error("not enough tailroom: requested {requested}, available {available}")]
#[non_exhaustive]
pub struct NotEnoughTailRoom {
    /// The number of bytes requested.
    pub requested: u16,
    /// The number of bytes available.
    pub available: u16,
}

/// The buffer holds fewer bytes than the requested trim length.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
#[error("buffer holds {available} bytes, cannot trim {requested}")]
#[non_exhaustive]
pub struct MemoryBufferNotLongEnough {
    /// The number of bytes requested.
    pub requested: u16,
    /// The number of bytes available.
    pub available: u16,
}

/// Report the unused space ahead of the start of the packet.
pub trait Headroom {
    /// The number of bytes which can be prepended without reallocation.
    fn headroom(&self) -> u16;
}

/// Report the unused space after the end of the packet.
pub trait Tailroom {
    /// The number of bytes which can be appended without reallocation.
    fn tailroom(&self) -> u16;
}

/// Extend the packet at the front.
pub trait Prepend {
    /// The error returned when the buffer cannot be prepended to.
    type Error: core::fmt::Debug;

    /// Grow the packet by `len` bytes at the front.
    ///
    /// Returns the full (grown) contents as a mutable slice.  The new bytes
    /// are not zeroed.
    ///
    /// # Errors
    ///
    /// Fails if the buffer has fewer than `len` bytes of headroom.
    fn prepend(&mut self, len: u16) -> Result<&mut [u8], Self::Error>;
}

/// Extend the packet at the back.
pub trait Append {
    /// The error returned when the buffer cannot be appended to.
    type Error: core::fmt::Debug;

    /// Grow the packet by `len` bytes at the back.
    ///
    /// Returns the full (grown) contents as a mutable slice.  The new bytes
    /// are not zeroed.
    ///
    /// # Errors
    ///
    /// Fails if the buffer has fewer than `len` bytes of tailroom.
    fn append(&mut self, len: u16) -> Result<&mut [u8], Self::Error>;
}

/// Shrink the packet at the front.
pub trait TrimFromStart {
    /// The error returned when the buffer cannot be trimmed.
    type Error: core::fmt::Debug;

    /// Remove `len` bytes from the front of the packet.
    ///
    /// Returns the remaining contents as a mutable slice.
    ///
    /// # Errors
    ///
    /// Fails if the packet holds fewer than `len` bytes.
    fn trim_from_start(&mut self, len: u16) -> Result<&mut [u8], Self::Error>;
}

/// Shrink the packet at the back.
pub trait TrimFromEnd {
    /// The error returned when the buffer cannot be trimmed.
    type Error: core::fmt::Debug;

    /// Remove `len` bytes from the back of the packet.
    ///
    /// Returns the remaining contents as a mutable slice.
    ///
    /// # Errors
    ///
    /// Fails if the packet holds fewer than `len` bytes.
    fn trim_from_end(&mut self, len: u16) -> Result<&mut [u8], Self::Error>;
}

/// A read-only view of a packet buffer.
pub trait PacketBuffer: AsRef<[u8]> + Headroom + core::fmt::Debug + 'static {}

impl<T> PacketBuffer for T where T: AsRef<[u8]> + Headroom + core::fmt::Debug + 'static {}

/// A packet buffer the translation engine can reshape.
pub trait PacketBufferMut:
    PacketBuffer
    + AsMut<[u8]>
    + Prepend<Error = NotEnoughHeadRoom>
    + Append<Error = NotEnoughTailRoom>
    + TrimFromStart<Error = MemoryBufferNotLongEnough>
    + TrimFromEnd<Error = MemoryBufferNotLongEnough>
    + Tailroom
    + Send
{
}

impl<T> PacketBufferMut for T where
    T: PacketBuffer
        + AsMut<[u8]>
        + Prepend<Error = NotEnoughHeadRoom>
        + Append<Error = NotEnoughTailRoom>
        + TrimFromStart<Error = MemoryBufferNotLongEnough>
        + TrimFromEnd<Error = MemoryBufferNotLongEnough>
        + Tailroom
        + Send
{
}
