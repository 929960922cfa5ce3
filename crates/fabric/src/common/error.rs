//! Configuration-time error types.
//!
//! The fabric has no runtime failure channel: malformed bus traffic is
//! resolved permissively (reads return zero, writes are dropped) and
//! coherence conflicts are ordinary protocol events. Every error in this
//! module is a structural invariant violation that must be rejected when the
//! topology is elaborated, before any transaction flows.

use super::addr::AddressRange;

/// A structural invariant violation detected while building the topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Two decode windows in the same table share at least one address.
    #[error("address ranges {0:#x?} and {1:#x?} overlap")]
    OverlappingRanges(AddressRange, AddressRange),

    /// A decode window has zero size and can never claim an address.
    #[error("address range at {0:#x} has zero size")]
    EmptyRange(u64),

    /// A decode table was built with no slave ports.
    #[error("decode table has no slave ports")]
    NoSlaves,

    /// Two registers were mapped at the same offset within one bank.
    #[error("duplicate register at offset {0:#x}")]
    DuplicateRegister(u64),

    /// A register offset is not word aligned.
    #[error("register offset {0:#x} is not word aligned")]
    MisalignedRegister(u64),

    /// The configured core count is outside the supported range.
    #[error("unsupported core count {0} (this fabric supports 1 or 2 harts)")]
    BadCoreCount(usize),

    /// Dual-core configurations disable the shared cache by design; the two
    /// options are mutually exclusive.
    #[error("dual-core configurations do not take a shared cache")]
    SharedCacheWithDualCore,

    /// The prefetcher splices into the shared-cache path and cannot exist
    /// without it.
    #[error("prefetcher configured without the shared cache")]
    PrefetcherWithoutCache,

    /// An interrupt controller was configured with more sources than the
    /// pending bitmap can hold.
    #[error("interrupt source count {0} exceeds the supported maximum of 31")]
    TooManyIrqSources(usize),
}
