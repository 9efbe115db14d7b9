// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 address subclasses

#[allow(unused_imports)] // deliberate re-export
#[cfg(any(test, feature = "bolero"))]
pub use contract::*;
use std::net::Ipv4Addr;

/// A type representing the set of unicast ipv4 addresses.
#[non_exhaustive]
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UnicastIpv4Addr(Ipv4Addr);

impl UnicastIpv4Addr {
    /// Returns the supplied [`Ipv4Addr`] as a [`UnicastIpv4Addr`]
    /// after confirming that it is in fact unicast.
    ///
    /// # Errors
    ///
    /// Returns the supplied [`Ipv4Addr`] in the [`Err`] case if the supplied address is multicast.
    pub fn new(addr: Ipv4Addr) -> Result<UnicastIpv4Addr, Ipv4Addr> {
        if addr.is_multicast() {
            Err(addr)
        } else {
            Ok(UnicastIpv4Addr(addr))
        }
    }

    /// Return the inner (unqualified) [`Ipv4Addr`]
    #[must_use]
    pub const fn inner(self) -> Ipv4Addr {
        self.0
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::ipv4::addr::UnicastIpv4Addr;
    use bolero::{Driver, TypeGenerator};
    use std::net::Ipv4Addr;

    impl TypeGenerator for UnicastIpv4Addr {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let ip = Ipv4Addr::from(driver.produce::<u32>()?);
            // multicast ipv4 addresses live in 224.0.0.0/4
            // map back to unicast space if we hit a multicast address
            if ip.is_multicast() {
                let mut octets = ip.octets();
                octets[0] ^= 0xe0;
                return Some(UnicastIpv4Addr(Ipv4Addr::from(octets)));
            }
            Some(UnicastIpv4Addr(ip))
        }
    }
}

#[cfg(test)]
mod test {
    use crate::ipv4::addr::UnicastIpv4Addr;

    #[test]
    #[cfg_attr(kani, kani::proof)]
    fn generated_unicast_ipv4_address_is_unicast() {
        bolero::check!()
            .with_type()
            .for_each(|unicast: &UnicastIpv4Addr| assert!(!unicast.inner().is_multicast()));
    }
}
