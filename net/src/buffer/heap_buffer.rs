// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A heap-allocated, growable packet buffer.

use crate::buffer::{
    Append, Headroom, MemoryBufferNotLongEnough, NotEnoughHeadRoom, NotEnoughTailRoom, Prepend,
    Tailroom, TrimFromEnd, TrimFromStart,
};

/// The packet is longer than a buffer can represent.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
#[error("packet of {0} bytes exceeds the maximum supported length")]
pub struct PacketTooLong(pub usize);

/// An owned packet buffer with reserved space at both ends.
///
/// The packet contents sit between a headroom and a tailroom region.
/// [`Prepend`] and [`Append`] claim bytes from those regions without moving
/// the contents; when a region is exhausted the buffer can be regrown with
/// [`HeapBuffer::grow_headroom`] / [`HeapBuffer::grow_tailroom`], which do
/// reallocate.
#[derive(Debug, Clone)]
pub struct HeapBuffer {
    buffer: Vec<u8>,
    headroom: u16,
    tailroom: u16,
}

impl HeapBuffer {
    /// Headroom reserved by [`HeapBuffer::from_packet`].
    pub const DEFAULT_HEADROOM: u16 = 64;
    /// Tailroom reserved by [`HeapBuffer::from_packet`].
    pub const DEFAULT_TAILROOM: u16 = 64;

    /// Copy `data` into a fresh buffer with the default reserves.
    ///
    /// # Errors
    ///
    /// Returns [`PacketTooLong`] if `data` is longer than `u16::MAX` bytes.
    pub fn from_packet(data: &[u8]) -> Result<HeapBuffer, PacketTooLong> {
        if u16::try_from(data.len()).is_err() {
            return Err(PacketTooLong(data.len()));
        }
        let headroom = Self::DEFAULT_HEADROOM;
        let tailroom = Self::DEFAULT_TAILROOM;
        let mut buffer = vec![0; usize::from(headroom)];
        buffer.extend_from_slice(data);
        buffer.resize(buffer.len() + usize::from(tailroom), 0);
        Ok(HeapBuffer {
            buffer,
            headroom,
            tailroom,
        })
    }

    fn contents_len(&self) -> usize {
        self.buffer.len() - usize::from(self.headroom) - usize::from(self.tailroom)
    }

    /// Add `extra` bytes of headroom, moving the contents.
    pub fn grow_headroom(&mut self, extra: u16) {
        if extra == 0 {
            return;
        }
        let mut buffer = vec![0; usize::from(extra)];
        buffer.extend_from_slice(&self.buffer);
        self.buffer = buffer;
        self.headroom = self.headroom.saturating_add(extra);
    }

    /// Add `extra` bytes of tailroom.
    pub fn grow_tailroom(&mut self, extra: u16) {
        if extra == 0 {
            return;
        }
        self.buffer.resize(self.buffer.len() + usize::from(extra), 0);
        self.tailroom = self.tailroom.saturating_add(extra);
    }
}

impl AsRef<[u8]> for HeapBuffer {
    fn as_ref(&self) -> &[u8] {
        let start = usize::from(self.headroom);
        let end = self.buffer.len() - usize::from(self.tailroom);
        &self.buffer[start..end]
    }
}

impl AsMut<[u8]> for HeapBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        let start = usize::from(self.headroom);
        let end = self.buffer.len() - usize::from(self.tailroom);
        &mut self.buffer[start..end]
    }
}

impl Headroom for HeapBuffer {
    fn headroom(&self) -> u16 {
        self.headroom
    }
}

impl Tailroom for HeapBuffer {
    fn tailroom(&self) -> u16 {
        self.tailroom
    }
}

impl Prepend for HeapBuffer {
    type Error = NotEnoughHeadRoom;

    fn prepend(&mut self, len: u16) -> Result<&mut [u8], Self::Error> {
        if len > self.headroom {
            return Err(NotEnoughHeadRoom {
                requested: len,
                available: self.headroom,
            });
        }
        self.headroom -= len;
        Ok(self.as_mut())
    }
}

impl Append for HeapBuffer {
    type Error = NotEnoughTailRoom;

    fn append(&mut self, len: u16) -> Result<&mut [u8], Self::Error> {
        if len > self.tailroom {
            return Err(NotEnoughTailRoom {
                requested: len,
                available: self.tailroom,
            });
        }
        self.tailroom -= len;
        Ok(self.as_mut())
    }
}

impl TrimFromStart for HeapBuffer {
    type Error = MemoryBufferNotLongEnough;

    fn trim_from_start(&mut self, len: u16) -> Result<&mut [u8], Self::Error> {
        let available = self.contents_len();
        if usize::from(len) > available {
            return Err(MemoryBufferNotLongEnough {
                requested: len,
                available: u16::try_from(available).unwrap_or(u16::MAX),
            });
        }
        self.headroom += len;
        Ok(self.as_mut())
    }
}

impl TrimFromEnd for HeapBuffer {
    type Error = MemoryBufferNotLongEnough;

    fn trim_from_end(&mut self, len: u16) -> Result<&mut [u8], Self::Error> {
        let available = self.contents_len();
        if usize::from(len) > available {
            return Err(MemoryBufferNotLongEnough {
                requested: len,
                available: u16::try_from(available).unwrap_or(u16::MAX),
            });
        }
        self.tailroom += len;
        Ok(self.as_mut())
    }
}
