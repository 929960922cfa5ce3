//! Bus fabric: transaction shape, ports, decode, arbitration, and remap.
//!
//! This module implements the two canonical fabric shapes plus the address
//! mapper. It provides:
//! 1. **Transactions:** Request/response records with byte-lane masking and
//!    a completion status, moved under valid/ready-style flow control.
//! 2. **1-to-N decode:** [`AddressDecoder`] routes one master's traffic to
//!    range-selected slaves over a table validated at configuration time.
//! 3. **N-to-1 arbitration:** [`BusArbiter`] merges several masters into one
//!    slave under a deterministic slot order or round-robin.
//! 4. **Remap:** [`AddressMapper`] applies a static region remap to the
//!    outgoing memory path.

/// N-to-1 request arbitration and response steering.
pub mod arbiter;

/// 1-to-N address-range decode.
pub mod decoder;

/// Static region remap for the outgoing memory path.
pub mod mapper;

/// Master/slave port contract.
pub mod port;

/// Request and response transaction records.
pub mod transaction;

pub use arbiter::{ArbiterPolicy, BusArbiter};
pub use decoder::{AddressDecoder, AddressMap, DecoderFallback};
pub use mapper::{AddressMapper, RegionMap};
pub use port::BusSlave;
pub use transaction::{AccessKind, BusRequest, BusResponse, BusStatus};
