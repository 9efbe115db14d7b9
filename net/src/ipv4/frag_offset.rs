// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fragment offset, in 8-byte units.
//!
//! The same 13-bit quantity appears in the IPv4 header and in the IPv6
//! fragment extension header, which is what lets translation map the offset
//! across families without rescaling; [`FragOffset`] is shared by both
//! header types.

use etherparse::IpFragOffset;

/// Position of a fragment's payload within the original packet's payload,
/// counted in units of 8 bytes.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FragOffset(pub(crate) IpFragOffset);

/// Errors which can occur when creating a [`FragOffset`]
#[derive(Debug, thiserror::Error)]
pub enum IllegalFragOffset {
    /// The value does not fit in the 13-bit field
    #[error("value too large for 13-bit fragment offset: {0:?}")]
    TooBig(u16),
}

impl FragOffset {
    /// Offset zero: the first (or only) fragment.
    pub const MIN: FragOffset = FragOffset(IpFragOffset::ZERO);

    /// The maximum possible [`FragOffset`] (8191, i.e. byte offset 65528)
    #[allow(unsafe_code)] // trivially safe const-eval
    pub const MAX: FragOffset =
        FragOffset(unsafe { IpFragOffset::new_unchecked(IpFragOffset::MAX_U16) });

    /// Map a raw 16-bit value to a [`FragOffset`]
    ///
    /// # Errors
    ///
    /// Returns an [`IllegalFragOffset`] when `raw` exceeds 13 bits.
    pub fn new(raw: u16) -> Result<FragOffset, IllegalFragOffset> {
        Ok(FragOffset(
            IpFragOffset::try_new(raw).map_err(|e| IllegalFragOffset::TooBig(e.actual))?,
        ))
    }

    /// The raw offset, in units of 8 bytes
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0.value()
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::ipv4::frag_offset::FragOffset;
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for FragOffset {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(
                FragOffset::new(driver.produce::<u16>()? & FragOffset::MAX.0.value())
                    .unwrap_or_else(|e| unreachable!("{e:?}")),
            )
        }
    }
}
