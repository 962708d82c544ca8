// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! Configuration payload and validation.
//!
//! Mirrors the builder pattern `s2n-quic-core::time::token_bucket::Builder`
//! uses: a plain `Builder` with chained setters, consumed by `build()`
//! (here fallible, since a rate table can legitimately produce a negative
//! `max_size`, unlike the token bucket's builder).

use crate::error::{Error, Result};
use core::time::Duration;

/// The inner queue's admission bound: either a byte budget (`Bfifo`) or a
/// packet-count budget (`Pfifo`/`PfifoHeadDrop`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Bytes(u32),
    Packets(u32),
}

/// A byte-length -> time-cost table, the Rust analogue of the kernel's
/// `qdisc_rate_table`: 256 cells, each covering `1 << cell_log` bytes, each
/// holding the time required to transmit a packet of that length at the
/// configured rate. `cost(len)` is the `R_tab[len]` / `P_tab[len]` lookup
/// the shaper consults on every dequeue attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateTable {
    cell_log: u8,
    cells: [Duration; 256],
}

impl RateTable {
    /// Builds a table from 256 precomputed cell costs, as the control plane
    /// delivers them: byte-length bucketed by `cell_log` mapped to the time
    /// needed to transmit that many bytes at the configured rate.
    pub fn new(cell_log: u8, cells: [Duration; 256]) -> Self {
        Self { cell_log, cells }
    }

    /// Builds a uniform table for a constant `rate` (bytes/sec), useful in
    /// tests and for simple single-rate configurations.
    pub fn at_rate(bytes_per_sec: u64, cell_log: u8) -> Self {
        let mut cells = [Duration::ZERO; 256];
        for (n, cell) in cells.iter_mut().enumerate() {
            let bytes = (n as u64) << cell_log;
            *cell = Duration::from_secs_f64(bytes as f64 / bytes_per_sec as f64);
        }
        Self { cell_log, cells }
    }

    #[inline]
    pub fn cell_log(&self) -> u8 {
        self.cell_log
    }

    /// The time cost of transmitting a packet of `len` bytes.
    #[inline]
    pub fn cost(&self, len: u32) -> Duration {
        let cell = (len >> self.cell_log).min(255) as usize;
        self.cells[cell]
    }

    /// The first cell index whose cost exceeds `budget`, i.e. the smallest
    /// packet length (in cells) that this table cannot fully cover from an
    /// empty bucket of depth `budget`.
    fn first_cell_over(&self, budget: Duration) -> Option<usize> {
        self.cells.iter().position(|cost| *cost > budget)
    }
}

/// Feedback transport selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    /// UDP to a loopback port (default `127.0.0.1:6660`).
    Datagram { port: u16 },
    /// Raw Ethernet frame handed to the host's device transmit path.
    Ethernet,
}

/// The configuration payload carried in over the (out-of-scope)
/// control-plane transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub limit: Limit,
    pub buffer: Duration,
    pub mtu: Duration,
    pub rate: RateTable,
    pub peak_rate: Option<RateTable>,
    pub q_eq: i64,
    pub w: i64,
    pub transport: Transport,
    max_size: u32,
}

impl Config {
    pub fn builder() -> Builder {
        Builder::default()
    }

    #[inline]
    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// The `{ limit, rate, peakrate, mtu, buffer }` read-back contract from
    /// `spec.md` §6 — the control-plane-visible subset of this config
    /// (`q_eq`/`w` are module tunables, not part of the per-instance
    /// payload, so they are deliberately not reflected here).
    pub fn dump(&self) -> crate::stats::Dump {
        crate::stats::Dump {
            limit: self.limit,
            rate: self.rate.clone(),
            peak_rate: self.peak_rate.clone(),
            mtu: self.mtu,
            buffer: self.buffer,
        }
    }
}

/// Default target queue equilibrium, 33 792 bytes.
pub const DEFAULT_Q_EQ: i64 = 33_792;
/// Default derivative weight.
pub const DEFAULT_W: i64 = 2;

pub struct Builder {
    limit: Option<Limit>,
    buffer: Option<Duration>,
    mtu: Option<Duration>,
    rate: Option<RateTable>,
    peak_rate: Option<RateTable>,
    q_eq: i64,
    w: i64,
    transport: Transport,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            limit: None,
            buffer: None,
            mtu: None,
            rate: None,
            peak_rate: None,
            q_eq: DEFAULT_Q_EQ,
            w: DEFAULT_W,
            transport: Transport::Datagram { port: 6660 },
        }
    }
}

impl Builder {
    #[inline]
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    #[inline]
    pub fn with_buffer(mut self, buffer: Duration) -> Self {
        self.buffer = Some(buffer);
        self
    }

    #[inline]
    pub fn with_mtu(mut self, mtu: Duration) -> Self {
        self.mtu = Some(mtu);
        self
    }

    #[inline]
    pub fn with_rate(mut self, rate: RateTable) -> Self {
        self.rate = Some(rate);
        self
    }

    #[inline]
    pub fn with_peak_rate(mut self, peak_rate: RateTable) -> Self {
        self.peak_rate = Some(peak_rate);
        self
    }

    #[inline]
    pub fn with_q_eq(mut self, q_eq: i64) -> Self {
        self.q_eq = q_eq;
        self
    }

    #[inline]
    pub fn with_w(mut self, w: i64) -> Self {
        self.w = w;
        self
    }

    #[inline]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Validates the configuration and derives `max_size`: the first cell
    /// index `n` whose `R_tab[n]` exceeds `buffer`, left-shifted by
    /// `cell_log` and decremented by one, further reduced by the analogous
    /// peak-rate computation against `mtu` if a peak rate is configured.
    /// Rejects the configuration if the derived `max_size` is negative.
    pub fn build(self) -> Result<Config> {
        let limit = self.limit.ok_or(Error::BadConfig("missing limit"))?;
        let buffer = self.buffer.ok_or(Error::BadConfig("missing buffer"))?;
        let mtu = self.mtu.ok_or(Error::BadConfig("missing mtu"))?;
        let rate = self.rate.ok_or(Error::BadConfig("missing rate table"))?;

        let mut max_size = derive_max_size(&rate, buffer);

        if let Some(peak_rate) = &self.peak_rate {
            let peak_max_size = derive_max_size(peak_rate, mtu);
            max_size = max_size.min(peak_max_size);
        }

        if max_size < 0 {
            return Err(Error::BadConfig("derived max_size is negative"));
        }

        Ok(Config {
            limit,
            buffer,
            mtu,
            rate,
            peak_rate: self.peak_rate,
            q_eq: self.q_eq,
            w: self.w,
            transport: self.transport,
            max_size: max_size as u32,
        })
    }
}

/// The first cell index whose cost exceeds `budget` (256 — one past the
/// table's last cell — if none does), left-shifted by `cell_log` and
/// decremented by one. Every table has 256 cells, so this is total; the
/// `max_size < 0` check in [`Builder::build`] is what actually rejects a
/// configuration, not this helper.
fn derive_max_size(table: &RateTable, budget: Duration) -> i64 {
    let cell = table.first_cell_over(budget).unwrap_or(256);
    ((cell as i64) << table.cell_log()) - 1
}
