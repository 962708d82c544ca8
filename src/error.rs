// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! The semantic error kinds surfaced by configuration and setup, as a
//! single `thiserror` enum.

/// Errors surfaced by configuration and initialization.
///
/// Per-packet outcomes (`OVERLIMIT_DROP`, `CONGESTED`, ring-full, transport
/// failure) are never fallible returns in this crate — they are represented
/// by [`crate::queue::Admission`], [`crate::tbf::EnqueueOutcome`], and the
/// counters in [`crate::stats::Stats`], per `spec.md` §7 ("Per-packet drops
/// are counted ... Emitter errors are log-only"). This enum carries only the
/// kinds `spec.md` §7 actually says "surface to the control plane as
/// negative returns": bad configuration. Allocation/setup failures
/// (`NO_RESOURCES`) have no call site in this crate, since it neither
/// allocates packet buffers nor spawns fallible OS resources during
/// `init` — that variant belongs to the host's own setup path, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Configuration was malformed or internally inconsistent (e.g. the
    /// derived `max_size` is negative).
    #[error("bad configuration: {0}")]
    BadConfig(&'static str),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
