//! Cache-coherence layer.
//!
//! This module keeps a single consistent view of memory across the harts'
//! private caches. It provides:
//! 1. **Per-core domains:** [`CoherenceDomain`] fronts one core's fetch and
//!    data streams, mirrors per-line sharing state, and services probes.
//! 2. **Cross-core broadcast:** [`CoherenceBroadcaster`] serializes the two
//!    harts' merged streams in a fixed slot order and force-invalidates or
//!    downgrades remote copies before a conflicting request completes.
//!
//! Lines are tracked at bus-word granularity (one 64-bit beat), the width
//! of the shared datapath.

/// Cross-core probe serialization and the sharing directory.
pub mod broadcast;

/// Per-core coherence management.
pub mod domain;

pub use broadcast::{BroadcastPort, CoherenceBroadcaster};
pub use domain::{CoherenceDomain, MemPath};

/// Shift from byte address to coherence-line index.
pub const LINE_SHIFT: u64 = 3;

/// Sharing state of one line as seen by a private cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineState {
    /// The cache holds no copy.
    #[default]
    Invalid,
    /// The cache holds a read-only copy; other caches may too.
    Shared,
    /// The cache holds the only copy and may write it.
    Exclusive,
}

/// A coherence message asking a private cache to give up rights to a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeKind {
    /// Drop the line entirely (a remote core wants to write).
    Invalidate,
    /// Demote an exclusive copy to shared (a remote core wants to read).
    Downgrade,
}

/// Answer to a probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeResponse {
    /// The state transition took effect; the prober may complete.
    Ack,
    /// A local fill or write to the same line is still in flight; probe
    /// again once it drains.
    Retry,
}

/// Returns the coherence-line index of a byte address.
pub const fn line_of(addr: u64) -> u64 {
    addr >> LINE_SHIFT
}
