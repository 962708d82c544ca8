// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! Time abstractions shared by the TBF watchdog and the QCN sampler.
//!
//! Grounded on `s2n-quic-core::time`: a `Clock` trait decouples the hot
//! path from wall time, a `Timestamp` newtype keeps comparisons
//! clock-scoped, and a plain `Timer` records a single pending expiration
//! without owning any scheduling machinery itself.

mod clock;
mod timer;
mod timestamp;

#[cfg(any(test, feature = "testing"))]
pub use clock::testing;
pub use clock::{Clock, StdClock};
pub use timer::Timer;
pub use timestamp::Timestamp;
