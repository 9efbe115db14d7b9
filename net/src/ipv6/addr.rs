// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Unicast-refined IPv6 address type

#[allow(unused_imports)] // deliberate re-export
#[cfg(any(test, feature = "bolero"))]
pub use contract::*;
use std::net::Ipv6Addr;

/// An [`Ipv6Addr`] which is known not to be multicast.
///
/// A multicast source address is never legal, so the header type demands
/// this refinement for the source field and accepts any address for the
/// destination.
#[non_exhaustive]
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UnicastIpv6Addr(Ipv6Addr);

impl UnicastIpv6Addr {
    /// Refine `addr` to a [`UnicastIpv6Addr`].
    ///
    /// # Errors
    ///
    /// Hands `addr` back in the [`Err`] case if it is multicast.
    pub fn new(addr: Ipv6Addr) -> Result<UnicastIpv6Addr, Ipv6Addr> {
        if addr.is_multicast() {
            Err(addr)
        } else {
            Ok(UnicastIpv6Addr(addr))
        }
    }

    /// Return the plain [`Ipv6Addr`], refinement discarded
    #[must_use]
    pub const fn inner(self) -> Ipv6Addr {
        self.0
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::ipv6::addr::UnicastIpv6Addr;
    use bolero::{Driver, TypeGenerator};
    use std::net::Ipv6Addr;

    impl TypeGenerator for UnicastIpv6Addr {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let ip = Ipv6Addr::from(driver.produce::<u128>()?);
            if ip.is_multicast() {
                // flip the leading ff00::/8 byte to leave multicast space
                let mut octets = ip.octets();
                octets[0] ^= 0xff;
                return Some(UnicastIpv6Addr(Ipv6Addr::from(octets)));
            }
            Some(UnicastIpv6Addr(ip))
        }
    }
}

#[cfg(test)]
mod test {
    use crate::ipv6::addr::UnicastIpv6Addr;

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn generated_unicast_ipv6_address_is_unicast() {
        bolero::check!()
            .with_type()
            .for_each(|unicast: &UnicastIpv6Addr| assert!(!unicast.inner().is_multicast()));
    }
}
