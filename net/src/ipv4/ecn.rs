// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Explicit congestion notification.
//!
//! Translation maps this field 1:1 onto the low two bits of the IPv6
//! traffic class, so the type enforces the 2-bit range at the boundary.

use etherparse::Ipv4Ecn;

/// The [ECN] bits of an [`Ipv4`] header.
///
/// [`Ipv4`]: crate::ipv4::Ipv4
/// [ECN]: https://en.wikipedia.org/wiki/Explicit_Congestion_Notification
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ecn(pub(crate) Ipv4Ecn);

/// Errors which can occur when creating an [`Ecn`]
#[derive(Debug, thiserror::Error)]
pub enum InvalidEcnError {
    /// The value does not fit in the 2-bit field
    #[error("ECN value {0} too large")]
    TooBig(u8),
}

impl Ecn {
    /// The minimum legal [`Ecn`] value (not ECN-capable)
    pub const MIN: Ecn = Ecn(Ipv4Ecn::ZERO);
    /// The maximum legal [`Ecn`] value (congestion experienced)
    #[allow(unsafe_code)] // trivially sound constant eval
    pub const MAX: Ecn = Ecn(unsafe { Ipv4Ecn::new_unchecked(Ipv4Ecn::MAX_U8) });

    /// Map a raw value to an [`Ecn`]
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidEcnError`] when `raw` exceeds two bits.
    pub fn new(raw: u8) -> Result<Ecn, InvalidEcnError> {
        Ok(Ecn(
            Ipv4Ecn::try_new(raw).map_err(|e| InvalidEcnError::TooBig(e.actual))?,
        ))
    }

    /// The raw 2-bit value
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0.value()
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::ipv4::ecn::Ecn;
    use bolero::{Driver, TypeGenerator};
    use etherparse::Ipv4Ecn;

    impl TypeGenerator for Ecn {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let raw = driver.produce::<u8>()? & Ecn::MAX.0.value();
            Some(Ecn(Ipv4Ecn::try_new(raw).unwrap_or_else(|_| unreachable!())))
        }
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::Ecn;

    #[test]
    fn two_bit_range_is_enforced() {
        assert_eq!(Ecn::new(0).unwrap(), Ecn::MIN);
        assert_eq!(Ecn::new(3).unwrap(), Ecn::MAX);
        assert!(Ecn::new(4).is_err());
    }
}
