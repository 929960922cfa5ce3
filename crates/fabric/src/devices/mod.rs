//! Memory-mapped control devices and bus collaborators.
//!
//! This module contains the devices the topology instantiates: the
//! timer/software-interrupt controller (CLINT-equivalent), the external
//! interrupt controller, and a simple fixed-latency RAM used as the default
//! outer-bus collaborator.

/// Timer and software interrupt controller (CLINT-equivalent).
pub mod clint;

/// External interrupt controller with a double-registered input vector.
pub mod plic;

/// Fixed-latency backing memory implementing the slave port contract.
pub mod ram;

pub use clint::MachineTimer;
pub use plic::ExternalInterruptController;
pub use ram::Ram;
