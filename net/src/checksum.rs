// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Generic trait for header checksums.

use std::fmt::Debug;

/// A checksum field does not match the value computed over its payload.
#[derive(Debug, thiserror::Error, Copy, Clone, PartialEq, Eq)]
#[error("checksum mismatch: expected {expected:?}, found {actual:?}")]
pub struct ChecksumError<C: Debug> {
    /// The checksum computed from the payload.
    pub expected: C,
    /// The checksum stored in the header.
    pub actual: C,
}

/// Compute and manipulate the checksum of a header.
pub trait Checksum {
    /// The data the checksum is computed over (beyond the header itself).
    ///
    /// Use `()` for headers whose checksum only covers the header.
    type Payload<'a>: ?Sized;
    /// The wrapper type for this header's checksum field.
    type Checksum: Eq + Copy + Sized + Debug;

    /// The checksum currently stored in the header.
    ///
    /// No promise is made that the stored checksum is consistent with the
    /// header or payload.
    fn checksum(&self) -> Self::Checksum;

    /// Compute the checksum of this header over `payload`.
    ///
    /// The stored checksum field is neither consulted nor modified.
    fn compute_checksum(&self, payload: &Self::Payload<'_>) -> Self::Checksum;

    /// Store `checksum` in the header, with no validation.
    fn set_checksum(&mut self, checksum: Self::Checksum) -> &mut Self;

    /// Check the stored checksum against the one computed over `payload`.
    ///
    /// # Errors
    ///
    /// Returns a [`ChecksumError`] describing both values if they disagree.
    fn validate_checksum(
        &self,
        payload: &Self::Payload<'_>,
    ) -> Result<(), ChecksumError<Self::Checksum>> {
        let expected = self.compute_checksum(payload);
        let actual = self.checksum();
        if expected == actual {
            Ok(())
        } else {
            Err(ChecksumError { expected, actual })
        }
    }

    /// Compute the checksum over `payload` and store it in the header.
    fn update_checksum(&mut self, payload: &Self::Payload<'_>) -> &mut Self {
        let checksum = self.compute_checksum(payload);
        self.set_checksum(checksum);
        #[cfg(debug_assertions)]
        #[allow(clippy::panic)] // faulty impl of `Checksum` is a programming error
        {
            if let Err(e) = self.validate_checksum(payload) {
                panic!("set checksum failed to validate: {e:?}");
            }
        }
        self
    }
}
