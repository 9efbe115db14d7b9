// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! UDP checksum type and methods

use crate::checksum::Checksum;
use crate::headers::Net;
use crate::udp::Udp;
use core::fmt::{Display, Formatter};
use std::fmt::Debug;

/// A [`Udp`] [checksum]
///
/// [checksum]: https://en.wikipedia.org/wiki/User_Datagram_Protocol#Checksum_computation
#[repr(transparent)]
#[derive(serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct UdpChecksum(pub(crate) u16);

impl UdpChecksum {
    /// The "no checksum" marker, legal for UDP over IPv4 only.
    pub const ZERO: Self = Self(0);

    /// Map a raw value to a [`UdpChecksum`]
    #[must_use]
    pub const fn new(raw: u16) -> UdpChecksum {
        UdpChecksum(raw)
    }

    /// Returns `true` if this is the "no checksum" marker.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Display for UdpChecksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

impl AsRef<u16> for UdpChecksum {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl From<u16> for UdpChecksum {
    fn from(raw: u16) -> Self {
        Self::new(raw)
    }
}

impl From<UdpChecksum> for u16 {
    fn from(checksum: UdpChecksum) -> Self {
        checksum.0
    }
}

/// The payload over which a UDP checksum is computed.
pub struct UdpChecksumPayload<'a> {
    net: &'a Net,
    contents: &'a [u8],
}

impl<'a> UdpChecksumPayload<'a> {
    /// Assemble a new UDP checksum payload.
    #[must_use]
    pub const fn new(net: &'a Net, contents: &'a [u8]) -> Self {
        Self { net, contents }
    }
}

impl Checksum for Udp {
    type Payload<'a> = UdpChecksumPayload<'a>;
    type Checksum = UdpChecksum;

    fn checksum(&self) -> Self::Checksum {
        UdpChecksum(self.0.checksum)
    }

    /// Compute the UDP checksum over `payload`.
    ///
    /// The result is never the zero marker: a computed checksum of zero is
    /// transmitted as `0xFFFF` per RFC 768.
    fn compute_checksum(&self, payload: &Self::Payload<'_>) -> Self::Checksum {
        let computed = match payload.net {
            Net::Ipv4(ip) => self.0.calc_checksum_ipv4_raw(
                ip.source().inner().octets(),
                ip.destination().octets(),
                payload.contents,
            ),
            Net::Ipv6(ip) => self.0.calc_checksum_ipv6_raw(
                ip.source().inner().octets(),
                ip.destination().octets(),
                payload.contents,
            ),
        };
        UdpChecksum(computed.unwrap_or_else(|e| unreachable!("{e:?}")))
    }

    fn set_checksum(&mut self, checksum: Self::Checksum) -> &mut Self {
        self.0.checksum = checksum.0;
        self
    }
}
