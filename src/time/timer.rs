// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

use crate::time::Timestamp;

/// A single scheduled expiration.
///
/// `Timer` itself does not run anything; it is a plain value a component
/// polls against the current time. The actual re-entry into the dequeue
/// path on expiration is driven by a [`crate::tbf::Watchdog`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    expiration: Option<Timestamp>,
}

impl Timer {
    #[inline]
    pub fn set(&mut self, time: Timestamp) {
        self.expiration = Some(time);
    }

    #[inline]
    pub fn cancel(&mut self) {
        self.expiration = None;
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.expiration.is_some()
    }

    #[inline]
    pub fn next_expiration(&self) -> Option<Timestamp> {
        self.expiration
    }

    #[inline]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.expiration {
            Some(expiration) => expiration.has_elapsed(now),
            None => false,
        }
    }
}
