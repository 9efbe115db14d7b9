// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ICMPv6` checksum type and methods

use crate::checksum::Checksum;
use crate::icmp6::Icmp6;
use core::fmt::{Display, Formatter};
use std::fmt::Debug;
use std::net::Ipv6Addr;

/// An `ICMPv6` [checksum]
///
/// [checksum]: https://en.wikipedia.org/wiki/ICMPv6#Checksum
#[repr(transparent)]
#[derive(serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Icmp6Checksum(pub(crate) u16);

impl Display for Icmp6Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

impl Icmp6Checksum {
    /// Map a raw value to a [`Icmp6Checksum`]
    #[must_use]
    pub const fn new(raw: u16) -> Icmp6Checksum {
        Icmp6Checksum(raw)
    }
}

impl AsRef<u16> for Icmp6Checksum {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl From<u16> for Icmp6Checksum {
    fn from(raw: u16) -> Self {
        Self::new(raw)
    }
}

impl From<Icmp6Checksum> for u16 {
    fn from(checksum: Icmp6Checksum) -> Self {
        checksum.0
    }
}

/// The payload over which an `ICMPv6` checksum is computed.
///
/// Unlike `ICMPv4`, the checksum covers a pseudo-header built from the source
/// and destination addresses of the enclosing IPv6 header.
pub struct Icmp6ChecksumPayload<'a> {
    src: Ipv6Addr,
    dst: Ipv6Addr,
    contents: &'a [u8],
}

impl<'a> Icmp6ChecksumPayload<'a> {
    /// Assemble a new `ICMPv6` checksum payload.
    #[must_use]
    pub const fn new(src: Ipv6Addr, dst: Ipv6Addr, contents: &'a [u8]) -> Self {
        Self {
            src,
            dst,
            contents,
        }
    }
}

impl Checksum for Icmp6 {
    type Payload<'a> = Icmp6ChecksumPayload<'a>;
    type Checksum = Icmp6Checksum;

    fn checksum(&self) -> Self::Checksum {
        Icmp6Checksum(self.0.checksum)
    }

    fn compute_checksum(&self, payload: &Self::Payload<'_>) -> Self::Checksum {
        let computed = self.0.icmp_type.calc_checksum(
            payload.src.octets(),
            payload.dst.octets(),
            payload.contents,
        );
        Icmp6Checksum(computed.unwrap_or_else(|e| unreachable!("{e:?}")))
    }

    fn set_checksum(&mut self, checksum: Self::Checksum) -> &mut Self {
        self.0.checksum = checksum.0;
        self
    }
}
