//! Address range type used by decode and remap tables.
//!
//! An [`AddressRange`] is a half-open `(base, size)` window in the physical
//! address space. Decode tables are built from sets of ranges that must be
//! mutually disjoint; that invariant is checked once at configuration time,
//! never per transaction.

use serde::Deserialize;

/// A half-open window `[base, base + size)` in the physical address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub struct AddressRange {
    /// First address covered by the window.
    pub base: u64,
    /// Size of the window in bytes.
    pub size: u64,
}

impl AddressRange {
    /// Creates a new range from a base address and size in bytes.
    pub const fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    /// Returns the first address past the end of the window.
    ///
    /// Saturates at `u64::MAX` so a window ending at the top of the address
    /// space compares correctly.
    pub const fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    /// Returns whether the window contains the given address.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Returns whether two windows share any address.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// Returns the offset of `addr` relative to the window base.
    ///
    /// Callers must have established containment first; the subtraction wraps
    /// otherwise.
    pub const fn offset_of(&self, addr: u64) -> u64 {
        addr.wrapping_sub(self.base)
    }
}
