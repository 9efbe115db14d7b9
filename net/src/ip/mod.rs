// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IP protocol numbers, common to IPv4 and IPv6.

use etherparse::IpNumber;

/// An IP protocol number ("next header" in IPv6 parlance).
///
/// The protocol number space is shared between IPv4 and IPv6; translation
/// carries the value across unchanged for everything except ICMP, which has
/// distinct numbers for its v4 and v6 incarnations.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NextHeader(pub(crate) IpNumber);

impl NextHeader {
    /// ICMP for IPv4 (protocol number 1).
    pub const ICMP: NextHeader = NextHeader(IpNumber::ICMP);
    /// TCP (protocol number 6).
    pub const TCP: NextHeader = NextHeader(IpNumber::TCP);
    /// UDP (protocol number 17).
    pub const UDP: NextHeader = NextHeader(IpNumber::UDP);
    /// The IPv6 fragment extension header (protocol number 44).
    pub const IPV6_FRAG: NextHeader = NextHeader(IpNumber::IPV6_FRAGMENTATION_HEADER);
    /// ICMP for IPv6 (protocol number 58).
    pub const ICMP6: NextHeader = NextHeader(IpNumber::IPV6_ICMP);

    /// Create a [`NextHeader`] from a raw protocol number.
    #[must_use]
    pub const fn new(raw: u8) -> NextHeader {
        NextHeader(IpNumber(raw))
    }

    /// The raw protocol number.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0.0
    }
}

impl From<IpNumber> for NextHeader {
    fn from(value: IpNumber) -> Self {
        NextHeader(value)
    }
}

impl From<NextHeader> for IpNumber {
    fn from(value: NextHeader) -> Self {
        value.0
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::ip::NextHeader;
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for NextHeader {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(NextHeader::new(driver.produce::<u8>()?))
        }
    }
}
