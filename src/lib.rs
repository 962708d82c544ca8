// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! Congestion point core for a QCN-enabled packet queueing discipline.
//!
//! This crate implements the pieces that live inside a single congestion
//! point: a byte or packet FIFO (`queue`), a dual leaky-bucket shaper
//! wrapping it (`tbf`), the QCN sampling state machine that watches every
//! admitted packet (`qcn`), and an asynchronous feedback-frame emitter that
//! never blocks the admission path (`feedback`). The host owns packet
//! I/O, the control-plane transport that delivers [`config::Config`], and
//! the Reaction Point at the sender — none of that is in scope here.
//!
//! A typical embedding wraps an inner [`queue::QueueDiscipline`] (e.g.
//! [`queue::Bfifo`]) in a [`tbf::TokenBucketFilter`], drives `enqueue`/
//! `dequeue` from the host's packet-processing loop, and hands any
//! [`qcn::FeedbackSample`] produced by `enqueue` to a [`feedback::Emitter`].

pub mod config;
pub mod error;
pub mod feedback;
pub mod inet;
pub mod packet;
pub mod qcn;
pub mod queue;
pub mod stats;
pub mod tbf;
pub mod time;

pub use error::{Error, Result};
