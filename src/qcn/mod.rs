// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! The QCN Congestion Point sampler.
//!
//! `CongestionPoint` is a pure value type over the integer state triple —
//! no I/O, no allocation — in the same spirit as
//! `recovery::cubic::CubicCongestionController`: an explicit state struct
//! with `#[inline]` hot-path methods and saturating arithmetic, reproducing
//! a numeric contract bit-for-bit rather than approximating it.

mod mark_table;

use mark_table::mark_table_credit;
use tracing::trace;

/// `Q_EQ`/`W` tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    pub q_eq: i64,
    pub w: i64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            q_eq: crate::config::DEFAULT_Q_EQ,
            w: crate::config::DEFAULT_W,
        }
    }
}

/// The fields needed to build a feedback frame, once a sample is due and
/// the sampled packet is IPv4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackSample {
    /// The 6-bit quantized feedback value, `qntz_Fb` ∈ {0..63}.
    pub qntz_fb: u8,
    pub qoff: i64,
    pub qdelta: i64,
}

/// The QCN Congestion Point's numeric state: `qlen`, `qlen_old`,
/// `sample_credit`, `pending_feedback`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CongestionPoint {
    qlen: i64,
    qlen_old: i64,
    sample_credit: i64,
    pending_feedback: bool,
    params: Params,
}

/// Initial `sample_credit`, also the mark table's out-of-range fallback
/// row.
pub const INITIAL_SAMPLE_CREDIT: i64 = 153_600;

impl CongestionPoint {
    pub fn new(params: Params) -> Self {
        Self {
            qlen: 0,
            qlen_old: 0,
            sample_credit: INITIAL_SAMPLE_CREDIT,
            pending_feedback: false,
            params,
        }
    }

    #[inline]
    pub fn qlen(&self) -> i64 {
        self.qlen
    }

    #[inline]
    pub fn qlen_old(&self) -> i64 {
        self.qlen_old
    }

    #[inline]
    pub fn sample_credit(&self) -> i64 {
        self.sample_credit
    }

    #[inline]
    pub fn pending_feedback(&self) -> bool {
        self.pending_feedback
    }

    /// Invoked exactly once per admitted packet, with its byte length `L`
    /// and whether it is IPv4. Returns the fields for a feedback frame if
    /// (and only if) feedback is due on an IPv4-eligible packet.
    ///
    /// The caller is responsible for calling [`Self::clear_pending_feedback`]
    /// once the returned sample has actually been handed off to the
    /// emitter, not merely once it has been produced.
    #[inline]
    pub fn observe(&mut self, len: u32, is_ipv4: bool) -> Option<FeedbackSample> {
        self.qlen += i64::from(len);

        let delta = self.qlen - self.qlen_old;
        let mut fb = (self.params.q_eq - self.qlen) - self.params.w * delta;
        let lower_bound = -self.params.q_eq * (2 * self.params.w + 1);
        if fb < lower_bound {
            fb = lower_bound;
        } else if fb > 0 {
            fb = 0;
        }

        // -fb is bounded by `q_eq * (2w + 1)`, which fits comfortably in a
        // u32 for any sane configuration; the 6-bit quantization keeps only
        // the three most-significant non-zero bits of a ~19-bit value.
        let qntz_fb = ((-fb) as u32 >> 13) & 0x3F;

        self.sample_credit -= i64::from(len);
        if self.sample_credit < 0 {
            if qntz_fb > 0 {
                self.pending_feedback = true;
            }
            self.qlen_old = self.qlen;
            self.sample_credit = mark_table_credit(qntz_fb);
            trace!(qlen = self.qlen, qntz_fb, next_credit = self.sample_credit, "qcn sample");
        }

        if self.pending_feedback && is_ipv4 {
            Some(FeedbackSample {
                qntz_fb: qntz_fb as u8,
                qoff: self.params.q_eq - self.qlen,
                qdelta: self.qlen - self.qlen_old,
            })
        } else {
            None
        }
    }

    /// Clears `pending_feedback` after a successful hand-off to the
    /// emitter. Does nothing if no feedback was pending.
    #[inline]
    pub fn clear_pending_feedback(&mut self) {
        self.pending_feedback = false;
    }

    /// Invoked on dequeue or drop of a packet of length `L`; the only way
    /// `qlen` decreases. Forgetting to call this on every release path is
    /// the classic bug in an implementation of this state machine —
    /// `qlen` only ever grows and feedback saturates permanently.
    #[inline]
    pub fn on_released(&mut self, len: u32) {
        self.qlen -= i64::from(len);
    }

    /// Resets to the initial state: `qlen` and `qlen_old` zeroed,
    /// `sample_credit` back to [`INITIAL_SAMPLE_CREDIT`], `pending_feedback`
    /// cleared.
    pub fn reset(&mut self) {
        *self = Self::new(self.params);
    }

    /// Updates the `Q_EQ`/`W` tunables in place, leaving `qlen`, `qlen_old`,
    /// `sample_credit`, and `pending_feedback` untouched.
    ///
    /// Used by a live reconfiguration (`spec.md` §5 "change") that swaps the
    /// shaping config without replacing the inner queue — the congestion
    /// point's accumulated state survives that kind of reconfiguration; only
    /// a queue replacement re-initializes it (see
    /// [`crate::tbf::TokenBucketFilter::change`]).
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp() -> CongestionPoint {
        CongestionPoint::new(Params { q_eq: 33_792, w: 2 })
    }

    #[test]
    fn single_packet_is_below_equilibrium_and_silent() {
        let mut cp = cp();
        let sample = cp.observe(1500, true);

        assert_eq!(cp.qlen(), 1500);
        assert!(sample.is_none());
        assert_eq!(cp.sample_credit(), 152_100);
    }

    #[test]
    fn sustained_burst_saturates_and_emits() {
        // 103 packets of 1500 bytes crosses the sample_credit threshold and
        // saturates Fb. The clamp at the lower bound fires before `qntz_fb`
        // is computed (qlen_old is also updated before qdelta is read), the
        // same order `sch_tbf_switch.c`'s `tbf_enqueue` applies: raw
        // `Fb = (33_792 - 154_500) - 2*154_500 = -429_708`, clamped to
        // `-q_eq*(2w+1) = -168_960` before quantization, giving
        // `qntz_fb = (168_960 >> 13) & 0x3F = 20` and `qdelta = 0`.
        let mut cp = cp();
        let mut last = None;
        for _ in 0..103 {
            last = cp.observe(1500, true);
        }

        assert_eq!(cp.qlen(), 154_500);
        let sample = last.expect("feedback should have been generated by packet 103");
        assert_eq!(sample.qntz_fb, 20);
        assert_eq!(sample.qoff, 33_792 - 154_500);
        assert_eq!(sample.qdelta, 0);
        assert_eq!(cp.sample_credit(), 51_200);
    }

    #[test]
    fn non_ipv4_packet_defers_to_next_ipv4_sample() {
        let mut cp = cp();
        // push qlen far past equilibrium so the very first sample saturates
        for _ in 0..103 {
            cp.observe(1500, false);
        }
        assert!(cp.pending_feedback(), "a non-IPv4 sample still sets pending_feedback");

        // the 104th packet (the first IPv4 one) carries the deferred
        // feedback, sampled fresh against the qlen_old/sample_credit the
        // 103rd call already rolled over: Fb is back within bounds here
        // (-125_208, unclamped), so qntz_fb = 125_208 >> 13 & 0x3F = 15.
        let sample = cp
            .observe(1500, true)
            .expect("the next IPv4 packet should carry the deferred feedback");
        assert_eq!(sample.qntz_fb, 15);
    }

    #[test]
    fn dequeue_and_drop_are_the_only_way_qlen_decreases() {
        let mut cp = cp();
        cp.observe(1500, true);
        assert_eq!(cp.qlen(), 1500);

        cp.on_released(1500);
        assert_eq!(cp.qlen(), 0);
    }

    #[test]
    fn reset_restores_documented_initial_state() {
        let mut cp = cp();
        for _ in 0..103 {
            cp.observe(1500, true);
        }

        cp.reset();
        assert_eq!(cp.qlen(), 0);
        assert_eq!(cp.qlen_old(), 0);
        assert_eq!(cp.sample_credit(), INITIAL_SAMPLE_CREDIT);
        assert!(!cp.pending_feedback());
    }

    #[test]
    fn feedback_is_cleared_only_on_explicit_acknowledgement() {
        let mut cp = cp();
        for _ in 0..103 {
            cp.observe(1500, true);
        }
        assert!(cp.pending_feedback());

        cp.clear_pending_feedback();
        assert!(!cp.pending_feedback());
    }

    #[test]
    fn set_params_updates_tunables_without_touching_accumulated_state() {
        let mut cp = cp();
        cp.observe(1500, true);
        assert_eq!(cp.qlen(), 1500);

        cp.set_params(Params { q_eq: 10_000, w: 4 });
        assert_eq!(cp.qlen(), 1500);
        assert_eq!(cp.qlen_old(), 0);
        assert_eq!(cp.sample_credit(), 152_100);

        // no sample is due yet, but the next one uses the new Q_EQ/W
        let sample = cp.observe(10_000, true);
        assert!(sample.is_none());
        assert_eq!(cp.qlen(), 11_500);
    }
}
