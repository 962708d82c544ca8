// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

use super::{Admission, Backlog, QueueDiscipline};
use crate::{packet::Packet, stats::Stats};
use tracing::trace;

/// A packet-count FIFO with tail drop on overflow: admission compares
/// `backlog_packets` against `limit` instead of `Bfifo`'s byte budget.
#[derive(Debug)]
pub struct Pfifo<P: Packet> {
    backlog: Backlog<P>,
    limit: u32,
}

impl<P: Packet> Pfifo<P> {
    pub fn new(limit: u32) -> Self {
        Self {
            backlog: Backlog::new(),
            limit,
        }
    }
}

impl<P: Packet> QueueDiscipline for Pfifo<P> {
    type Packet = P;

    #[inline]
    fn enqueue(&mut self, packet: P) -> Admission<P> {
        if self.backlog.len() < self.limit as usize {
            self.backlog.push_back(packet);
            Admission::Accepted
        } else {
            self.backlog.stats_mut().on_overlimit();
            trace!(limit = self.limit, "pfifo overlimit drop");
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

/// A packet-count FIFO that evicts the head on overflow instead of
/// rejecting the new tail: on overflow it dequeues the head, accounts its
/// loss, enqueues the new tail, and returns [`Admission::Congested`] rather
/// than plain success.
#[derive(Debug)]
pub struct PfifoHeadDrop<P: Packet> {
    backlog: Backlog<P>,
    limit: u32,
}

impl<P: Packet> PfifoHeadDrop<P> {
    pub fn new(limit: u32) -> Self {
        Self {
            backlog: Backlog::new(),
            limit,
        }
    }
}

impl<P: Packet> QueueDiscipline for PfifoHeadDrop<P> {
    type Packet = P;

    #[inline]
    fn enqueue(&mut self, packet: P) -> Admission<P> {
        if self.backlog.len() < self.limit as usize {
            self.backlog.push_back(packet);
            return Admission::Accepted;
        }

        let evicted = self.backlog.pop_front();
        if evicted.is_some() {
            self.backlog.stats_mut().on_drop();
        }
        self.backlog.push_back(packet);
        trace!(limit = self.limit, "pfifo head-drop: evicted oldest packet");
        Admission::Congested
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
