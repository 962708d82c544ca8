// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! The asynchronous feedback-frame emitter.
//!
//! Grounded on the bounded producer/consumer split `s2n-quic-dc::pool::Pool`
//! uses to decouple a hot allocation path from a slower reclaim path,
//! adapted here to `tokio::sync::mpsc` so the consumer is a cooperative
//! async task rather than a dedicated OS thread. [`Emitter::push`] never
//! blocks and never errors: a full ring or a transport failure both simply
//! increment `feedback_lost`, since feedback delivery is unreliable by
//! design.

mod frame;
mod transport;

pub use frame::{EthernetFrame, FeedbackFrame};
pub use transport::{DatagramTransport, EthernetDeviceTransport, EthernetTransmit, FeedbackTransport};

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// The bounded ring's capacity: enough to absorb a brief burst of samples
/// without the consumer task falling behind, never large enough to let a
/// stalled consumer pile up unbounded memory.
pub const DEFAULT_CAPACITY: usize = 32;

/// How long the consumer task waits for the next item before looping back
/// to check for a closed channel; keeps shutdown latency bounded without a
/// separate stop flag.
const IDLE_TICK: std::time::Duration = std::time::Duration::from_secs(1);

/// Hands feedback items from the synchronous admission path to a
/// background task that actually puts them on the wire.
pub struct Emitter<T> {
    sender: mpsc::Sender<T>,
    feedback_lost: Arc<AtomicU64>,
    _task: tokio::task::JoinHandle<()>,
}

impl<T> Emitter<T>
where
    T: Send + 'static,
{
    /// Spawns the consumer task and returns a handle that can be cloned
    /// across producers (the sender half of an `mpsc` channel is `Clone`).
    pub fn spawn<X>(transport: X, capacity: usize) -> Self
    where
        X: FeedbackTransport<T>,
    {
        let (sender, receiver) = mpsc::channel(capacity);
        let feedback_lost = Arc::new(AtomicU64::new(0));
        let task = tokio::task::spawn(Self::run(receiver, transport, feedback_lost.clone()));

        Self {
            sender,
            feedback_lost,
            _task: task,
        }
    }

    async fn run<X>(mut receiver: mpsc::Receiver<T>, transport: X, feedback_lost: Arc<AtomicU64>)
    where
        X: FeedbackTransport<T>,
    {
        loop {
            match tokio::time::timeout(IDLE_TICK, receiver.recv()).await {
                Ok(Some(item)) => {
                    if !transport.send(item).await {
                        feedback_lost.fetch_add(1, Ordering::Relaxed);
                        debug!("feedback item dropped by transport");
                    }
                }
                Ok(None) => {
                    trace!("feedback emitter channel closed, consumer exiting");
                    return;
                }
                Err(_elapsed) => continue,
            }
        }
    }

    /// Enqueues `item` for the consumer task without blocking. Returns
    /// `false` (and counts the loss) if the ring is full or the consumer
    /// task has exited.
    pub fn push(&self, item: T) -> bool {
        match self.sender.try_send(item) {
            Ok(()) => true,
            Err(_) => {
                self.feedback_lost.fetch_add(1, Ordering::Relaxed);
                trace!("feedback ring full, sample dropped");
                false
            }
        }
    }

    pub fn feedback_lost(&self) -> u64 {
        self.feedback_lost.load(Ordering::Relaxed)
    }
}
