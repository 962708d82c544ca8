// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! An opaque, monotonic point in time.

use core::{fmt, time::Duration};

/// An absolute point in time, sourced from a [`super::Clock`].
///
/// The absolute value is not meaningful outside of the clock that produced
/// it; only differences between two `Timestamp`s sourced from the same
/// clock are meaningful. This mirrors `std::time::Instant` but can be
/// constructed deterministically for tests (see [`super::testing`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Duration);

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({:?})", self.0)
    }
}

impl Timestamp {
    /// Constructs a `Timestamp` from a duration since some clock-defined epoch.
    ///
    /// Only the clock implementations in [`super`] should call this directly.
    #[inline]
    pub const fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    #[inline]
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// Returns the duration elapsed since `earlier`, or `Duration::ZERO` if
    /// `earlier` is not actually earlier than `self`.
    #[inline]
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    #[inline]
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.0.checked_add(duration).map(Self)
    }

    #[inline]
    pub fn has_elapsed(self, now: Timestamp) -> bool {
        now.0 >= self.0
    }
}

impl core::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl core::ops::Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_duration() {
        let a = Timestamp::from_duration(Duration::from_secs(1));
        let b = Timestamp::from_duration(Duration::from_secs(2));
        assert!(a < b);
        assert_eq!(b - a, Duration::from_secs(1));
        assert_eq!(a.saturating_duration_since(b), Duration::ZERO);
    }

    #[test]
    fn has_elapsed_is_inclusive() {
        let t = Timestamp::from_duration(Duration::from_secs(5));
        assert!(t.has_elapsed(t));
        assert!(t.has_elapsed(t + Duration::from_millis(1)));
        assert!(!Timestamp::from_duration(Duration::from_secs(6)).has_elapsed(t));
    }
}
