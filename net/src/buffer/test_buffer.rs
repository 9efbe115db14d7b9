// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A fixed-capacity packet buffer for tests.

use crate::buffer::{
    Append, Headroom, MemoryBufferNotLongEnough, NotEnoughHeadRoom, NotEnoughTailRoom, Prepend,
    Tailroom, TrimFromEnd, TrimFromStart,
};
use tracing::trace;

/// A 2048-byte buffer which mimics the layout of a real packet memory pool
/// element: fixed capacity, with headroom and tailroom reserves around the
/// packet contents.
///
/// Unlike [`crate::buffer::HeapBuffer`] it never reallocates, which makes it
/// the right tool for exercising the out-of-room failure paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBuffer {
    buffer: Vec<u8>,
    headroom: u16,
    tailroom: u16,
}

impl TestBuffer {
    /// The total capacity of a [`TestBuffer`].
    pub const CAPACITY: u16 = 2048;
    /// The default headroom reserve.
    pub const HEADROOM: u16 = 96;
    /// The default tailroom reserve.
    pub const TAILROOM: u16 = 96;

    /// Create an empty [`TestBuffer`] whose contents region is filled with a
    /// byte pattern (so tests notice uninitialized reads).
    #[must_use]
    pub fn new() -> TestBuffer {
        #[allow(clippy::cast_possible_truncation)] // index is bounded by CAPACITY
        let buffer: Vec<u8> = (0..Self::CAPACITY).map(|idx| (idx % 256) as u8).collect();
        TestBuffer {
            buffer,
            headroom: Self::HEADROOM,
            tailroom: Self::TAILROOM,
        }
    }

    /// Create a [`TestBuffer`] holding a copy of `data`.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not fit between the default reserves.
    #[must_use]
    #[allow(clippy::panic)] // test tooling
    pub fn from_raw_data(data: &[u8]) -> TestBuffer {
        let max = usize::from(Self::CAPACITY - Self::HEADROOM - Self::TAILROOM);
        assert!(
            data.len() <= max,
            "test data of {len} bytes exceeds capacity {max}",
            len = data.len()
        );
        let mut buffer = vec![0; usize::from(Self::HEADROOM)];
        buffer.extend_from_slice(data);
        buffer.resize(usize::from(Self::CAPACITY), 0);
        #[allow(clippy::cast_possible_truncation)] // bounded by CAPACITY
        let tailroom = (usize::from(Self::CAPACITY) - usize::from(Self::HEADROOM) - data.len())
            as u16;
        TestBuffer {
            buffer,
            headroom: Self::HEADROOM,
            tailroom,
        }
    }
}

impl Default for TestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestBuffer {
    fn drop(&mut self) {
        trace!("dropping test buffer of {} bytes", self.as_ref().len());
    }
}

impl AsRef<[u8]> for TestBuffer {
    fn as_ref(&self) -> &[u8] {
        let start = usize::from(self.headroom);
        let end = self.buffer.len() - usize::from(self.tailroom);
        &self.buffer[start..end]
    }
}

impl AsMut<[u8]> for TestBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        let start = usize::from(self.headroom);
        let end = self.buffer.len() - usize::from(self.tailroom);
        &mut self.buffer[start..end]
    }
}

impl Headroom for TestBuffer {
    fn headroom(&self) -> u16 {
        self.headroom
    }
}

impl Tailroom for TestBuffer {
    fn tailroom(&self) -> u16 {
        self.tailroom
    }
}

impl Prepend for TestBuffer {
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

impl Append for TestBuffer {
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

impl TrimFromStart for TestBuffer {
    type Error = MemoryBufferNotLongEnough;

    fn trim_from_start(&mut self, len: u16) -> Result<&mut [u8], Self::Error> {
        let available = self.as_ref().len();
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

impl TrimFromEnd for TestBuffer {
    type Error = MemoryBufferNotLongEnough;

    fn trim_from_end(&mut self, len: u16) -> Result<&mut [u8], Self::Error> {
        let available = self.as_ref().len();
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

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use crate::buffer::TestBuffer;
    use crate::buffer::{Headroom, Prepend, Tailroom, TrimFromStart};

    #[test]
    fn new_test_buffer_has_default_reserves() {
        let buffer = TestBuffer::new();
        assert_eq!(buffer.headroom(), TestBuffer::HEADROOM);
        assert_eq!(buffer.tailroom(), TestBuffer::TAILROOM);
    }

    #[test]
    fn from_raw_data_round_trips() {
        bolero::check!().with_type().for_each(|data: &Vec<u8>| {
            if data.len() > 1800 {
                return;
            }
            let buffer = TestBuffer::from_raw_data(data);
            assert_eq!(buffer.as_ref(), data.as_slice());
        });
    }

    #[test]
    fn trim_then_prepend_restores_length() {
        let mut buffer = TestBuffer::from_raw_data(&[0xab; 64]);
        buffer.trim_from_start(40).unwrap();
        assert_eq!(buffer.as_ref().len(), 24);
        let contents = buffer.prepend(20).unwrap();
        assert_eq!(contents.len(), 44);
    }
}
