//! # Unit Components
//!
//! This module serves as the central hub for the fabric's unit tests. It
//! organizes the tests by layer, from the register-bank substrate up to
//! the composed topology.

/// Unit tests for the bus fabric shapes.
///
/// This module covers the decode table, the 1-to-N decoder with both
/// fallback policies, the N-to-1 arbiter under both slot policies, and
/// the outgoing address mapper.
pub mod bus;


/// Unit tests for configuration defaults, deserialization, and topology
/// variant resolution.
pub mod config;


/// Unit tests for the register-bank substrate: masked writes, write
/// behaviors, read side effects, and map validation.
pub mod regbank;
