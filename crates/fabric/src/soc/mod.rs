//! System-on-chip composition.
//!
//! This module assembles the fabric components into a complete topology:
//! per-hart coherence domains and merge points, the optional shared cache
//! and prefetcher, the address mapper, the static MMIO partition, and the
//! interrupt devices with their out-of-band lines back to the cores.

/// Shared cache on the merged memory path.
pub mod cache;

/// Next-line prefetcher ahead of the shared cache.
pub mod prefetch;

/// Topology composition and the top-level [`SoC`](topology::SoC) type.
pub mod topology;

pub use cache::SharedCache;
pub use prefetch::NextLinePrefetcher;
pub use topology::{IrqLines, SoC};
