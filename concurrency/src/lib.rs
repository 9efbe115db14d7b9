// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Sync primitive facade for the translation engine.
//!
//! Code takes its locks and atomics from `concurrency::sync` instead of
//! `std::sync`, so the rule-table lock and the allocator/ID counters can be
//! model-checked by swapping the back-end at compile time: `std` by
//! default, `loom` or `shuttle` under the matching cargo feature.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

#[cfg(all(feature = "loom", feature = "shuttle"))]
compile_error!("features 'loom' and 'shuttle' are mutually exclusive");

/// The selected back-end's `sync` module (`Mutex`, `RwLock`, `atomic`, ...).
#[cfg(not(any(feature = "loom", feature = "shuttle")))]
pub use std::sync;

/// The selected back-end's `sync` module (`Mutex`, `RwLock`, `atomic`, ...).
#[cfg(feature = "loom")]
pub use loom::sync;

/// The selected back-end's `sync` module (`Mutex`, `RwLock`, `atomic`, ...).
#[cfg(feature = "shuttle")]
pub use shuttle::sync;
