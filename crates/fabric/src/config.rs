//! Configuration for the fabric model.
//!
//! This module defines all configuration structures and enums used to
//! parameterize a topology. It provides:
//! 1. **Defaults:** Baseline platform constants (memory map, timer, cache).
//! 2. **Structures:** Hierarchical config for system, timer, cache, memory,
//!    and interrupt wiring.
//! 3. **Variants:** The closed set of topology shapes a config can elaborate
//!    into, validated once at build time.
//!
//! Configuration is supplied as JSON (`serde_json`) or via
//! `Config::default()`.

use serde::Deserialize;

use crate::bus::mapper::RegionMap;
use crate::common::{AddressRange, ConfigError};

/// Default configuration constants for the fabric.
///
/// These values define the baseline platform when not explicitly overridden.
mod defaults {
    /// Base address of main system RAM (2 GiB).
    pub const RAM_BASE: u64 = 0x8000_0000;

    /// Total size of main system RAM (128 MiB).
    pub const RAM_SIZE: usize = 128 * 1024 * 1024;

    /// Fixed response latency of the bundled memory model, in cycles.
    pub const RAM_LATENCY: u64 = 4;

    /// Base address of the external-device MMIO region.
    pub const EXT_BASE: u64 = 0x1000_0000;

    /// Size of the external-device MMIO region (256 MiB).
    pub const EXT_SIZE: u64 = 0x1000_0000;

    /// Base address of the timer-controller MMIO window.
    pub const CLINT_BASE: u64 = 0x0200_0000;

    /// Base address of the interrupt-controller MMIO window.
    pub const PLIC_BASE: u64 = 0x0C00_0000;

    /// Reset value of the timer divider period (clock ticks per MTIME
    /// increment); a clock-scaled platform constant.
    pub const TIMER_FREQ: u16 = 100;

    /// Reset value of the MTIME increment step.
    pub const TIMER_INC: u16 = 1;

    /// MTIME jump applied per cycle while fast-forwarding an idle core.
    pub const WFI_JUMP: u64 = 0x1_0000;

    /// Number of external interrupt request lines.
    pub const IRQ_SOURCES: usize = 31;

    /// Shared cache capacity in bytes (64 KiB).
    pub const CACHE_SIZE: usize = 64 * 1024;

    /// Shared cache hit latency in cycles.
    pub const CACHE_LATENCY: u64 = 2;
}

/// The closed set of topology shapes a configuration can elaborate into.
///
/// Optional components are selected here, at build time, rather than by
/// runtime branching on mutable flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyVariant {
    /// One hart, memory path straight to the mapper.
    SingleCore,
    /// One hart with the shared cache spliced into the memory path.
    SingleCoreCache,
    /// One hart with the prefetcher feeding the shared cache.
    SingleCoreCachePrefetch,
    /// Two harts serialized by the coherence broadcaster; no shared cache.
    DualCore,
}

/// Policy for MMIO addresses outside every configured region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum UnmappedPolicy {
    /// Reads return zero, writes are dropped (permissive MMIO convention).
    #[default]
    Permissive,
    /// Route to the external-device region as a catch-all sink.
    CatchAll,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use rvfabric_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.system.core_count, 1);
/// assert_eq!(config.timer.inc_reset, 1);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use rvfabric_core::config::{Config, TopologyVariant};
///
/// let json = r#"{
///     "system": { "core_count": 2 },
///     "cache": { "enabled": false }
/// }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.variant().unwrap(), TopologyVariant::DualCore);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Core count and MMIO partition.
    #[serde(default)]
    pub system: SystemConfig,
    /// Timer-controller parameters.
    #[serde(default)]
    pub timer: TimerConfig,
    /// Shared cache and prefetcher.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Main memory and outgoing remap.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// External interrupt wiring.
    #[serde(default)]
    pub irq: IrqConfig,
}

impl Config {
    /// Parses a configuration from its JSON representation.
    ///
    /// Every field is optional; missing fields take the platform defaults.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Resolves the topology variant this configuration elaborates into.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadCoreCount`] outside 1..=2,
    /// [`ConfigError::SharedCacheWithDualCore`] when both are requested,
    /// and [`ConfigError::PrefetcherWithoutCache`] for a dangling
    /// prefetcher.
    pub fn variant(&self) -> Result<TopologyVariant, ConfigError> {
        if self.cache.prefetch && !self.cache.enabled {
            return Err(ConfigError::PrefetcherWithoutCache);
        }
        match (self.system.core_count, self.cache.enabled) {
            (1, false) => Ok(TopologyVariant::SingleCore),
            (1, true) if self.cache.prefetch => Ok(TopologyVariant::SingleCoreCachePrefetch),
            (1, true) => Ok(TopologyVariant::SingleCoreCache),
            (2, false) => Ok(TopologyVariant::DualCore),
            (2, true) => Err(ConfigError::SharedCacheWithDualCore),
            (n, _) => Err(ConfigError::BadCoreCount(n)),
        }
    }
}

/// Core count and static MMIO partition.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Number of harts (1 or 2).
    #[serde(default = "SystemConfig::default_core_count")]
    pub core_count: usize,

    /// External-device MMIO region.
    #[serde(default = "SystemConfig::default_ext_region")]
    pub ext_region: AddressRange,

    /// Timer-controller window base (the window size is fixed at 64 KiB).
    #[serde(default = "SystemConfig::default_clint_base")]
    pub clint_base: u64,

    /// Interrupt-controller window base (the window size is fixed at
    /// 64 MiB).
    #[serde(default = "SystemConfig::default_plic_base")]
    pub plic_base: u64,

    /// Handling of MMIO addresses no region claims.
    #[serde(default)]
    pub unmapped: UnmappedPolicy,
}

impl SystemConfig {
    /// Returns the default hart count.
    fn default_core_count() -> usize {
        1
    }

    /// Returns the default external-device region.
    fn default_ext_region() -> AddressRange {
        AddressRange::new(defaults::EXT_BASE, defaults::EXT_SIZE)
    }

    /// Returns the default timer-controller window base.
    fn default_clint_base() -> u64 {
        defaults::CLINT_BASE
    }

    /// Returns the default interrupt-controller window base.
    fn default_plic_base() -> u64 {
        defaults::PLIC_BASE
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            core_count: Self::default_core_count(),
            ext_region: Self::default_ext_region(),
            clint_base: Self::default_clint_base(),
            plic_base: Self::default_plic_base(),
            unmapped: UnmappedPolicy::default(),
        }
    }
}

/// Timer-controller parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    /// Reset value of the 16-bit divider period.
    #[serde(default = "TimerConfig::default_freq")]
    pub freq_reset: u16,

    /// Reset value of the 16-bit increment step.
    #[serde(default = "TimerConfig::default_inc")]
    pub inc_reset: u16,

    /// Simulation acceleration: fast-forward MTIME while the core is idle.
    /// Not part of the functional contract.
    #[serde(default)]
    pub fast_wfi: bool,

    /// MTIME jump applied per cycle while fast-forwarding.
    #[serde(default = "TimerConfig::default_wfi_jump")]
    pub wfi_jump: u64,
}

impl TimerConfig {
    /// Returns the default divider period.
    fn default_freq() -> u16 {
        defaults::TIMER_FREQ
    }

    /// Returns the default increment step.
    fn default_inc() -> u16 {
        defaults::TIMER_INC
    }

    /// Returns the default idle fast-forward jump.
    fn default_wfi_jump() -> u64 {
        defaults::WFI_JUMP
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            freq_reset: Self::default_freq(),
            inc_reset: Self::default_inc(),
            fast_wfi: false,
            wfi_jump: Self::default_wfi_jump(),
        }
    }
}

/// Shared cache and prefetcher selection.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Splice the shared cache into the memory path.
    #[serde(default)]
    pub enabled: bool,

    /// Capacity in bytes.
    #[serde(default = "CacheConfig::default_size")]
    pub size_bytes: usize,

    /// Hit latency in cycles.
    #[serde(default = "CacheConfig::default_latency")]
    pub latency: u64,

    /// Splice the next-line prefetcher ahead of the cache.
    #[serde(default)]
    pub prefetch: bool,
}

impl CacheConfig {
    /// Returns the default cache capacity.
    fn default_size() -> usize {
        defaults::CACHE_SIZE
    }

    /// Returns the default hit latency.
    fn default_latency() -> u64 {
        defaults::CACHE_LATENCY
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size_bytes: Self::default_size(),
            latency: Self::default_latency(),
            prefetch: false,
        }
    }
}

/// Main memory and the outgoing address remap.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// RAM base address in the SoC-internal address space.
    #[serde(default = "MemoryConfig::default_ram_base")]
    pub ram_base: u64,

    /// RAM size in bytes.
    #[serde(default = "MemoryConfig::default_ram_size")]
    pub ram_size: usize,

    /// Fixed response latency of the bundled memory model.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u64,

    /// Region remap applied before the outer memory port. Empty means
    /// identity.
    #[serde(default)]
    pub map: Vec<RegionMap>,
}

impl MemoryConfig {
    /// Returns the default RAM base address.
    fn default_ram_base() -> u64 {
        defaults::RAM_BASE
    }

    /// Returns the default RAM size in bytes.
    fn default_ram_size() -> usize {
        defaults::RAM_SIZE
    }

    /// Returns the default memory latency in cycles.
    fn default_latency() -> u64 {
        defaults::RAM_LATENCY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ram_base: Self::default_ram_base(),
            ram_size: Self::default_ram_size(),
            latency: Self::default_latency(),
            map: Vec::new(),
        }
    }
}

/// External interrupt wiring.
#[derive(Debug, Clone, Deserialize)]
pub struct IrqConfig {
    /// Number of external interrupt request lines (at most 31).
    #[serde(default = "IrqConfig::default_sources")]
    pub sources: usize,
}

impl IrqConfig {
    /// Returns the default external interrupt line count.
    fn default_sources() -> usize {
        defaults::IRQ_SOURCES
    }
}

impl Default for IrqConfig {
    fn default() -> Self {
        Self {
            sources: Self::default_sources(),
        }
    }
}
