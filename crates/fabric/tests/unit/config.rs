//! Configuration unit tests.

use pretty_assertions::assert_eq;
use rvfabric_core::common::ConfigError;
use rvfabric_core::config::{Config, TopologyVariant, UnmappedPolicy};

#[test]
fn defaults_describe_the_baseline_platform() {
    let config = Config::default();
    assert_eq!(config.system.core_count, 1);
    assert_eq!(config.system.ext_region.base, 0x1000_0000);
    assert_eq!(config.system.clint_base, 0x0200_0000);
    assert_eq!(config.system.plic_base, 0x0C00_0000);
    assert_eq!(config.system.unmapped, UnmappedPolicy::Permissive);
    assert_eq!(config.timer.freq_reset, 100);
    assert_eq!(config.timer.inc_reset, 1);
    assert!(!config.timer.fast_wfi);
    assert_eq!(config.memory.ram_base, 0x8000_0000);
    assert_eq!(config.memory.latency, 4);
    assert!(config.memory.map.is_empty());
    assert_eq!(config.irq.sources, 31);
    assert!(!config.cache.enabled);
    assert!(!config.cache.prefetch);
}

#[test]
fn default_variant_is_single_core() {
    let config = Config::default();
    assert_eq!(config.variant().unwrap(), TopologyVariant::SingleCore);
}

#[test]
fn variant_resolution_covers_all_shapes() {
    let mut config = Config::default();
    config.cache.enabled = true;
    assert_eq!(config.variant().unwrap(), TopologyVariant::SingleCoreCache);
    config.cache.prefetch = true;
    assert_eq!(
        config.variant().unwrap(),
        TopologyVariant::SingleCoreCachePrefetch
    );

    let mut config = Config::default();
    config.system.core_count = 2;
    assert_eq!(config.variant().unwrap(), TopologyVariant::DualCore);
}

#[test]
fn prefetcher_requires_the_cache() {
    let mut config = Config::default();
    config.cache.prefetch = true;
    let err = config.variant().unwrap_err();
    assert!(matches!(err, ConfigError::PrefetcherWithoutCache));
}

#[test]
fn dual_core_excludes_the_shared_cache() {
    let mut config = Config::default();
    config.system.core_count = 2;
    config.cache.enabled = true;
    let err = config.variant().unwrap_err();
    assert!(matches!(err, ConfigError::SharedCacheWithDualCore));
}

#[test]
fn unsupported_core_counts_are_rejected() {
    for count in [0, 3, 8] {
        let mut config = Config::default();
        config.system.core_count = count;
        let err = config.variant().unwrap_err();
        assert!(matches!(err, ConfigError::BadCoreCount(n) if n == count));
    }
}

#[test]
fn json_overrides_merge_with_defaults() {
    let json = r#"{
        "system": { "core_count": 2, "unmapped": "CatchAll" },
        "timer": { "freq_reset": 10 },
        "irq": { "sources": 8 }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.system.core_count, 2);
    assert_eq!(config.system.unmapped, UnmappedPolicy::CatchAll);
    assert_eq!(config.timer.freq_reset, 10);
    assert_eq!(config.timer.inc_reset, 1);
    assert_eq!(config.irq.sources, 8);
    assert_eq!(config.system.clint_base, 0x0200_0000);
}

#[test]
fn memory_map_regions_deserialize() {
    let json = r#"{
        "memory": {
            "map": [
                { "range": { "base": 4096, "size": 256 }, "outer_base": 65536 }
            ]
        }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.memory.map.len(), 1);
    assert_eq!(config.memory.map[0].range.base, 4096);
    assert_eq!(config.memory.map[0].outer_base, 65536);
}

#[test]
fn empty_json_is_the_default_configuration() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.variant().unwrap(), TopologyVariant::SingleCore);
    assert_eq!(config.system.core_count, 1);
}

#[test]
fn malformed_json_reports_a_parse_error() {
    assert!(Config::from_json("{ \"system\": ").is_err());
}
