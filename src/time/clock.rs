// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

use crate::time::Timestamp;
use std::time::Instant;

/// A source of [`Timestamp`]s.
///
/// Abstracting over the clock keeps the hot path (`tbf`, `qcn`) free of any
/// dependency on wall time, so tests can drive it with an entirely
/// deterministic, manually-advanced clock.
pub trait Clock: Send + Sync {
    fn get_time(&self) -> Timestamp;
}

/// A [`Clock`] backed by `std::time::Instant`.
#[derive(Debug)]
pub struct StdClock {
    epoch: Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl StdClock {
    pub const fn new(epoch: Instant) -> Self {
        Self { epoch }
    }
}

impl Clock for StdClock {
    #[inline]
    fn get_time(&self) -> Timestamp {
        Timestamp::from_duration(self.epoch.elapsed())
    }
}

/// Deterministic clocks for tests, also available outside `cfg(test)` under
/// the `testing` feature so downstream crates can drive this crate's types
/// with a controllable clock in their own integration tests.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use core::time::Duration;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A [`Clock`] whose time only advances when told to.
    ///
    /// Stored as nanoseconds-since-construction in an `AtomicU64` so the
    /// clock can be shared (`Arc<Clock>`) between the test driver and a
    /// background task without a mutex.
    #[derive(Debug, Default)]
    pub struct Clock {
        nanos: AtomicU64,
    }

    impl Clock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn advance(&self, duration: Duration) {
            self.nanos
                .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
        }

        pub fn set(&self, time: Timestamp) {
            self.nanos
                .store(time.as_duration().as_nanos() as u64, Ordering::SeqCst);
        }
    }

    impl super::Clock for Clock {
        #[inline]
        fn get_time(&self) -> Timestamp {
            Timestamp::from_duration(Duration::from_nanos(self.nanos.load(Ordering::SeqCst)))
        }
    }
}
