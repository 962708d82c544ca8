// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! Queue/TBF statistics and the configuration read-back.

use crate::config::{Limit, RateTable};
use core::time::Duration;

/// Counters exposed by every queueing-discipline variant.
///
/// `backlog_bytes`/`backlog_packets` are not duplicated here; they live on
/// the queue itself (`Backlog::backlog_bytes`) since they are derived from
/// the resident packets, not independently maintained counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub bytes: u64,
    pub packets: u64,
    pub drops: u64,
    pub overlimits: u64,
}

impl Stats {
    #[inline]
    pub(crate) fn on_enqueued(&mut self, len: u32) {
        self.bytes += u64::from(len);
        self.packets += 1;
    }

    #[inline]
    pub(crate) fn on_drop(&mut self) {
        self.drops += 1;
    }

    #[inline]
    pub(crate) fn on_overlimit(&mut self) {
        self.overlimits += 1;
    }
}

/// The `spec.md` §6 read-back contract: the current `limit`, `rate`,
/// `peak_rate` (`None` if absent), `mtu`, and `buffer`. Produced by
/// [`crate::config::Config::dump`] / [`crate::tbf::TokenBucketFilter::dump`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dump {
    pub limit: Limit,
    pub rate: RateTable,
    pub peak_rate: Option<RateTable>,
    pub mtu: Duration,
    pub buffer: Duration,
}
