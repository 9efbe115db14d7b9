// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Non-zero TCP port number.

use std::fmt::{Display, Formatter};
use std::num::NonZero;

/// A TCP port number.
///
/// Backed by [`NonZero`]: port zero never appears in legitimate traffic, and
/// excluding it keeps `Option<TcpPort>` pointer-sized in the header structs.
#[repr(transparent)]
#[allow(clippy::unsafe_derive_deserialize)] // both try_from and into u16 are safe for this type
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct TcpPort(NonZero<u16>);

/// Errors which can occur when creating a [`TcpPort`]
#[repr(transparent)]
#[derive(Debug, thiserror::Error, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum TcpPortError {
    /// Zero is not a legal port
    #[error("port must be non-zero")]
    Zero,
}

impl TcpPort {
    /// Wrap an already-proven non-zero value.
    #[must_use]
    pub const fn new(port: NonZero<u16>) -> TcpPort {
        TcpPort(port)
    }

    /// Validate a raw wire value into a [`TcpPort`].
    ///
    /// # Errors
    ///
    /// [`TcpPortError::Zero`] when `port` is zero.
    pub const fn new_checked(port: u16) -> Result<TcpPort, TcpPortError> {
        match NonZero::new(port) {
            None => Err(TcpPortError::Zero),
            Some(port) => Ok(TcpPort(port)),
        }
    }

    /// Wrap a raw value with no zero check.
    ///
    /// # Safety
    ///
    /// `port` must not be zero; a zero value here is undefined behavior.
    #[allow(unsafe_code)]
    #[must_use]
    pub const unsafe fn new_unchecked(port: u16) -> TcpPort {
        TcpPort(unsafe { NonZero::new_unchecked(port) })
    }

    /// The wire representation of the port.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0.get()
    }
}

impl Display for TcpPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TcpPort> for u16 {
    fn from(port: TcpPort) -> Self {
        port.0.get()
    }
}

impl TryFrom<u16> for TcpPort {
    type Error = TcpPortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new_checked(value)
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::tcp::port::TcpPort;
    use bolero::{Driver, TypeGenerator};
    use std::num::NonZero;

    impl TypeGenerator for TcpPort {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(TcpPort::new(driver.produce::<NonZero<u16>>()?))
        }
    }
}

#[allow(clippy::unwrap_used)] // valid in tests
#[cfg(test)]
mod test {
    use super::{TcpPort, TcpPortError};

    #[test]
    fn zero_is_rejected() {
        assert_eq!(TcpPort::new_checked(0), Err(TcpPortError::Zero));
        assert_eq!(TcpPort::new_checked(179).unwrap().as_u16(), 179);
        assert_eq!(u16::from(TcpPort::try_from(65535).unwrap()), 65535);
    }
}
