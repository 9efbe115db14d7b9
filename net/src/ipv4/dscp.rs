// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Differentiated services code point.
//!
//! Translation maps this field 1:1 onto the upper six bits of the IPv6
//! traffic class, so the type enforces the 6-bit range at the boundary.

use etherparse::Ipv4Dscp;

/// The [DSCP] bits of an [`Ipv4`] header.
///
/// [`Ipv4`]: crate::ipv4::Ipv4
/// [DSCP]: https://en.wikipedia.org/wiki/Differentiated_services
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Dscp(pub(crate) Ipv4Dscp);

/// Errors which can occur when creating a [`Dscp`]
#[derive(Debug, thiserror::Error)]
pub enum InvalidDscpError {
    /// The value does not fit in the 6-bit field
    #[error("DSCP value {0} too large")]
    TooBig(u8),
}

impl Dscp {
    /// The minimum legal [`Dscp`] value (default forwarding)
    pub const MIN: Dscp = Dscp(Ipv4Dscp::ZERO);
    /// The maximum legal [`Dscp`] value
    #[allow(unsafe_code)] // trivially sound constant eval
    pub const MAX: Dscp = Dscp(unsafe { Ipv4Dscp::new_unchecked(Ipv4Dscp::MAX_U8) });

    /// Map a raw value to a [`Dscp`]
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidDscpError`] when `raw` exceeds six bits.
    pub fn new(raw: u8) -> Result<Dscp, InvalidDscpError> {
        Ok(Dscp(
            Ipv4Dscp::try_new(raw).map_err(|e| InvalidDscpError::TooBig(e.actual))?,
        ))
    }

    /// The raw 6-bit value
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0.value()
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::ipv4::dscp::Dscp;
    use bolero::{Driver, TypeGenerator};
    use etherparse::Ipv4Dscp;

    impl TypeGenerator for Dscp {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let raw = driver.produce::<u8>()? & Dscp::MAX.0.value();
            Some(Dscp(
                Ipv4Dscp::try_new(raw).unwrap_or_else(|_| unreachable!()),
            ))
        }
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::Dscp;

    #[test]
    fn six_bit_range_is_enforced() {
        assert_eq!(Dscp::new(0).unwrap(), Dscp::MIN);
        assert_eq!(Dscp::new(63).unwrap(), Dscp::MAX);
        assert_eq!(Dscp::new(46).unwrap().raw(), 46);
        assert!(Dscp::new(64).is_err());
    }
}
