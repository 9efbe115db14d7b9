// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Non-zero UDP port number.

use std::fmt::{Display, Formatter};
use std::num::NonZero;

/// A UDP port number.
///
/// Backed by [`NonZero`]: port zero never appears in legitimate traffic, and
/// excluding it keeps `Option<UdpPort>` pointer-sized in the header structs.
#[repr(transparent)]
#[allow(clippy::unsafe_derive_deserialize)] // both try_from and into u16 are safe for this type
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct UdpPort(NonZero<u16>);

/// Errors which can occur when creating a [`UdpPort`]
#[repr(transparent)]
#[derive(Debug, thiserror::Error, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum UdpPortError {
    /// Zero is not a legal port
    #[error("port must be non-zero")]
    Zero,
}

impl UdpPort {
    /// Wrap an already-proven non-zero value.
    #[must_use]
    pub const fn new(port: NonZero<u16>) -> UdpPort {
        UdpPort(port)
    }

    /// Validate a raw wire value into a [`UdpPort`].
    ///
    /// # Errors
    ///
    /// [`UdpPortError::Zero`] when `port` is zero.
    pub const fn new_checked(port: u16) -> Result<UdpPort, UdpPortError> {
        match NonZero::new(port) {
            None => Err(UdpPortError::Zero),
            Some(port) => Ok(UdpPort(port)),
        }
    }

    /// Wrap a raw value with no zero check.
    ///
    /// # Safety
    ///
    /// `port` must not be zero; a zero value here is undefined behavior.
    #[allow(unsafe_code)]
    #[must_use]
    pub const unsafe fn new_unchecked(port: u16) -> UdpPort {
        UdpPort(unsafe { NonZero::new_unchecked(port) })
    }

    /// The wire representation of the port.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0.get()
    }
}

impl Display for UdpPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UdpPort> for u16 {
    fn from(port: UdpPort) -> Self {
        port.0.get()
    }
}

impl TryFrom<u16> for UdpPort {
    type Error = UdpPortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new_checked(value)
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::udp::port::UdpPort;
    use bolero::{Driver, TypeGenerator};
    use std::num::NonZero;

    impl TypeGenerator for UdpPort {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(UdpPort::new(driver.produce::<NonZero<u16>>()?))
        }
    }
}
