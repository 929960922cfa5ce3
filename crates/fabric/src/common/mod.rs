//! Common types shared by every layer of the fabric model.
//!
//! This module provides the fundamental vocabulary of the crate. It includes:
//! 1. **Address Ranges:** `(base, size)` windows used for bus decode and remap tables.
//! 2. **Byte Masks:** Per-byte-lane write strobes for the 64-bit datapath.
//! 3. **Error Handling:** Configuration-time invariant violations (`ConfigError`).

/// Address range definitions for decode and remap tables.
pub mod addr;

/// Configuration-time error types.
pub mod error;

/// Byte-lane write mask definitions.
pub mod mask;

pub use addr::AddressRange;
pub use error::ConfigError;
pub use mask::ByteMask;
