//! Transaction-level interconnect and MMIO fabric for a small RISC-V SoC.
//!
//! This crate models the glue between cores and memory at clocked
//! transaction granularity, with the following:
//! 1. **Bus:** Request/response records, 1-to-N address decode, N-to-1
//!    arbitration, and static address remapping.
//! 2. **Devices:** A register-bank substrate, the machine timer and
//!    software-interrupt block, a platform interrupt controller, and a
//!    latency-modelled RAM for closed-loop testing.
//! 3. **Coherence:** Per-core sharing domains and a cross-core broadcaster
//!    that serializes conflicting accesses with probes.
//! 4. **SoC:** Topology elaboration from configuration, a shared cache and
//!    next-line prefetcher, the MMIO partition, and typed interrupt lines.

/// Bus fabric (transactions, slave port, decoder, arbiter, mapper).
pub mod bus;
/// Cache-coherence layer (per-core domains, cross-core broadcast).
pub mod coherence;
/// Common types (address ranges, byte-lane masks, configuration errors).
pub mod common;
/// Fabric configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// MMIO devices (machine timer, interrupt controller, RAM model).
pub mod devices;
/// Memory-mapped register-bank substrate with side-effect policies.
pub mod regbank;
/// System composition (topology, shared cache, prefetcher).
pub mod soc;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Top-level system; construct with `SoC::new`.
pub use crate::soc::SoC;
