// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

use super::{Admission, Backlog, QueueDiscipline};
use crate::{packet::Packet, stats::Stats};
use tracing::trace;

/// A byte-granular FIFO: admission compares `backlog_bytes + len(p)` against
/// a byte `limit`, not a packet count.
#[derive(Debug)]
pub struct Bfifo<P: Packet> {
    backlog: Backlog<P>,
    limit: u32,
}

impl<P: Packet> Bfifo<P> {
    pub fn new(limit: u32) -> Self {
        Self {
            backlog: Backlog::new(),
            limit,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl<P: Packet> QueueDiscipline for Bfifo<P> {
    type Packet = P;

    #[inline]
    fn enqueue(&mut self, packet: P) -> Admission<P> {
        let len = packet.len();
        if self.backlog.backlog_bytes() + len <= self.limit {
            self.backlog.push_back(packet);
            Admission::Accepted
        } else {
            self.backlog.stats_mut().on_overlimit();
            trace!(len, limit = self.limit, "bfifo overlimit drop");
            Admission::Rejected(packet)
        }
    }

    #[inline]
    fn dequeue(&mut self) -> Option<P> {
        self.backlog.pop_front()
    }

    #[inline]
    fn peek(&self) -> Option<&P> {
        self.backlog.front()
    }

    #[inline]
    fn drop_tail(&mut self) -> u32 {
        let len = self.backlog.pop_back().map(|p| p.len()).unwrap_or(0);
        if len > 0 {
            self.backlog.stats_mut().on_drop();
        }
        len
    }

    #[inline]
    fn drop_head(&mut self) -> u32 {
        let len = self.backlog.pop_front().map(|p| p.len()).unwrap_or(0);
        if len > 0 {
            self.backlog.stats_mut().on_drop();
        }
        len
    }

    #[inline]
    fn reset(&mut self) {
        self.backlog.reset();
    }

    #[inline]
    fn backlog_bytes(&self) -> u32 {
        self.backlog.backlog_bytes()
    }

    #[inline]
    fn backlog_packets(&self) -> u32 {
        self.backlog.len() as u32
    }

    #[inline]
    fn stats(&self) -> &Stats {
        self.backlog.stats()
    }
}
