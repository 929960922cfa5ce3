//! Bus transaction records.
//!
//! A transaction is a request/response pair carrying address, direction,
//! data, byte-lane mask, and burst length, with a 2-bit-style completion
//! status on the response. The fabric models flow control at transaction
//! granularity: a request is either accepted this cycle or held by the
//! master and re-presented, and each port completes one transaction before
//! accepting the next.

use crate::common::ByteMask;

/// Direction of a bus transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Read from the addressed location.
    Read,
    /// Write the masked byte lanes of `data` to the addressed location.
    Write,
}

/// Completion status carried on every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusStatus {
    /// The transaction completed normally.
    Okay,
    /// The slave signalled an error. The fabric itself never raises this;
    /// it is forwarded unmodified from external collaborators.
    Error,
}

/// One bus request: address, direction, write data, lane mask, and burst
/// length in beats (0 = single beat).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusRequest {
    /// Target address.
    pub addr: u64,
    /// Read or write.
    pub kind: AccessKind,
    /// Write data; ignored on reads.
    pub data: u64,
    /// Byte lanes of `data` that are valid.
    pub mask: ByteMask,
    /// Additional beats after the first. The fabric forwards this as a hint;
    /// routing never splits a burst across slaves.
    pub burst: u8,
}

impl BusRequest {
    /// Builds a single-beat full-width read.
    pub const fn read(addr: u64) -> Self {
        Self {
            addr,
            kind: AccessKind::Read,
            data: 0,
            mask: ByteMask::ALL,
            burst: 0,
        }
    }

    /// Builds a single-beat 32-bit read of the addressed word.
    pub const fn read_word(addr: u64) -> Self {
        Self {
            mask: ByteMask::WORD,
            ..Self::read(addr)
        }
    }

    /// Builds a single-beat masked write.
    pub const fn write(addr: u64, data: u64, mask: ByteMask) -> Self {
        Self {
            addr,
            kind: AccessKind::Write,
            data,
            mask,
            burst: 0,
        }
    }

    /// Builds a single-beat 32-bit write of the addressed word.
    pub const fn write_word(addr: u64, data: u32) -> Self {
        Self::write(addr, data as u64, ByteMask::WORD)
    }
}

/// One bus response: read data (zero for writes) and completion status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusResponse {
    /// Read data, or zero for write completions.
    pub data: u64,
    /// Completion status.
    pub status: BusStatus,
}

impl BusResponse {
    /// An all-zero okay response, used by permissive unmapped decode.
    pub const ZERO: Self = Self::okay(0);

    /// Builds an okay response carrying `data`.
    pub const fn okay(data: u64) -> Self {
        Self {
            data,
            status: BusStatus::Okay,
        }
    }
}
