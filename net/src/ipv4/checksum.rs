// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 header checksum type and methods

use crate::checksum::Checksum;
use crate::ipv4::Ipv4;
use std::fmt::{Display, Formatter};

/// An [`Ipv4`] header [checksum]
///
/// Unlike the transport checksums, this one covers the header bytes alone:
/// no pseudo-header and no payload contribution.
///
/// [checksum]: https://en.wikipedia.org/wiki/Internet_checksum
#[repr(transparent)]
#[derive(serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Ipv4Checksum(u16);

impl Display for Ipv4Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

impl Ipv4Checksum {
    /// Map a raw value to an [`Ipv4Checksum`]
    #[must_use]
    pub const fn new(raw: u16) -> Ipv4Checksum {
        Ipv4Checksum(raw)
    }
}

impl From<u16> for Ipv4Checksum {
    fn from(raw: u16) -> Self {
        Self::new(raw)
    }
}

impl From<Ipv4Checksum> for u16 {
    fn from(checksum: Ipv4Checksum) -> Self {
        checksum.0
    }
}

impl Checksum for Ipv4 {
    // the header checksum needs nothing beyond the header itself
    type Payload<'a>
        = ()
    where
        Self: 'a;
    type Checksum = Ipv4Checksum;

    fn checksum(&self) -> Self::Checksum {
        Ipv4Checksum(self.0.header_checksum)
    }

    fn compute_checksum(&self, (): &Self::Payload<'_>) -> Self::Checksum {
        Ipv4Checksum(self.0.calc_header_checksum())
    }

    fn set_checksum(&mut self, checksum: Self::Checksum) -> &mut Self {
        self.0.header_checksum = checksum.0;
        self
    }
}
