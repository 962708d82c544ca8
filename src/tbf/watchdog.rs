// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! Re-entry scheduling for a starved [`super::TokenBucketFilter`].
//!
//! Grounded on `s2n-quic-core::time::timer::Provider` combined with the
//! `tokio::sync::Notify` wakeup pattern: arming schedules a single future
//! wakeup, cancellation is idempotent, and the caller (not the watchdog)
//! owns re-attempting the dequeue.

use crate::time::{Timer, Timestamp};

/// Schedules the single pending re-entry a starved [`super::TokenBucketFilter`]
/// needs once its buckets have refilled enough to admit the head packet.
pub trait Watchdog: Send {
    /// Arms the watchdog to fire at `deadline`; `now` is supplied so
    /// implementations that compute a relative delay don't need their own
    /// clock.
    fn arm(&mut self, deadline: Timestamp, now: Timestamp);
    fn cancel(&mut self);
    fn is_armed(&self) -> bool;
}

/// A [`Watchdog`] that only records the armed deadline in a plain [`Timer`],
/// for tests that drive dequeue re-attempts manually by advancing a
/// [`crate::time::testing::Clock`].
#[derive(Debug, Default)]
pub struct NullWatchdog {
    timer: Timer,
}

impl NullWatchdog {
    pub fn armed_until(&self) -> Option<Timestamp> {
        self.timer.next_expiration()
    }
}

impl Watchdog for NullWatchdog {
    fn arm(&mut self, deadline: Timestamp, _now: Timestamp) {
        self.timer.set(deadline);
    }

    fn cancel(&mut self) {
        self.timer.cancel();
    }

    fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }
}

/// A [`Watchdog`] backed by a `tokio::time::sleep` task that notifies an
/// `Arc<tokio::sync::Notify>` once the deadline passes. The caller awaits
/// [`TokioWatchdog::notify_handle`] (cloned up front) to know when to
/// retry [`super::TokenBucketFilter::dequeue`]. The pending deadline itself
/// is tracked in a [`Timer`], the same record-keeping `NullWatchdog` uses —
/// the `tokio` task is only what actually wakes something up at that
/// deadline.
#[derive(Debug)]
pub struct TokioWatchdog {
    notify: std::sync::Arc<tokio::sync::Notify>,
    handle: Option<tokio::task::JoinHandle<()>>,
    timer: Timer,
}

impl TokioWatchdog {
    pub fn new(notify: std::sync::Arc<tokio::sync::Notify>) -> Self {
        Self {
            notify,
            handle: None,
            timer: Timer::default(),
        }
    }

    pub fn notify_handle(&self) -> std::sync::Arc<tokio::sync::Notify> {
        self.notify.clone()
    }
}

impl Watchdog for TokioWatchdog {
    fn arm(&mut self, deadline: Timestamp, now: Timestamp) {
        self.cancel();
        let delay = deadline.saturating_duration_since(now);
        let notify = self.notify.clone();
        self.handle = Some(tokio::task::spawn(async move {
            tokio::time::sleep(delay).await;
            notify.notify_one();
        }));
        self.timer.set(deadline);
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.timer.cancel();
    }

    fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }
}

impl Drop for TokioWatchdog {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn null_watchdog_records_the_armed_deadline() {
        let mut watchdog = NullWatchdog::default();
        assert!(!watchdog.is_armed());

        let now = Timestamp::from_duration(Duration::ZERO);
        let deadline = now + Duration::from_millis(5);
        watchdog.arm(deadline, now);
        assert!(watchdog.is_armed());
        assert_eq!(watchdog.armed_until(), Some(deadline));

        watchdog.cancel();
        assert!(!watchdog.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_watchdog_notifies_after_the_delay() {
        let notify = std::sync::Arc::new(tokio::sync::Notify::new());
        let mut watchdog = TokioWatchdog::new(notify.clone());

        let now = Timestamp::from_duration(Duration::ZERO);
        watchdog.arm(now + Duration::from_millis(10), now);
        assert!(watchdog.is_armed());

        tokio::time::advance(Duration::from_millis(10)).await;
        notify.notified().await;
    }

    #[tokio::test]
    async fn cancelling_aborts_the_pending_task() {
        let notify = std::sync::Arc::new(tokio::sync::Notify::new());
        let mut watchdog = TokioWatchdog::new(notify);

        let now = Timestamp::from_duration(Duration::ZERO);
        watchdog.arm(now + Duration::from_secs(60), now);
        assert!(watchdog.is_armed());
        watchdog.cancel();
        assert!(!watchdog.is_armed());
    }
}
