//! Static address remap on the outgoing memory path.
//!
//! The mapper rewrites request addresses through a small region table
//! before they leave the SoC: an address inside a mapped window is
//! translated to the window's outer base plus offset, anything else passes
//! through unchanged. Responses need no translation.

use serde::Deserialize;

use super::decoder::AddressMap;
use super::port::BusSlave;
use super::transaction::{BusRequest, BusResponse};
use crate::common::ConfigError;
use crate::common::addr::AddressRange;

/// One remapped region: traffic inside `range` is re-based at `outer_base`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct RegionMap {
    /// Window in the SoC-internal address space.
    pub range: AddressRange,
    /// Base of the window as seen on the outer bus.
    pub outer_base: u64,
}

/// Pass-through port applying a region remap to request addresses.
pub struct AddressMapper {
    /// `None` for an empty table: the mapper is a pure pass-through.
    map: Option<AddressMap>,
    outer_bases: Vec<u64>,
    inner: Box<dyn BusSlave>,
}

impl AddressMapper {
    /// Builds a mapper over a validated, disjoint region table.
    ///
    /// An empty table is legal and makes the mapper a pure pass-through.
    ///
    /// # Errors
    ///
    /// Propagates range validation errors from [`AddressMap::new`].
    pub fn new(regions: Vec<RegionMap>, inner: Box<dyn BusSlave>) -> Result<Self, ConfigError> {
        if regions.is_empty() {
            return Ok(Self {
                map: None,
                outer_bases: Vec::new(),
                inner,
            });
        }
        let mut sorted = regions;
        sorted.sort_by_key(|r| r.range.base);
        let map = AddressMap::new(sorted.iter().map(|r| r.range).collect())?;
        let outer_bases = sorted.iter().map(|r| r.outer_base).collect();
        Ok(Self {
            map: Some(map),
            outer_bases,
            inner,
        })
    }

    /// Translates one address through the region table.
    fn translate(&self, addr: u64) -> u64 {
        let Some(map) = &self.map else {
            return addr;
        };
        map.decode(addr).map_or(addr, |idx| {
            self.outer_bases[idx] + map.range(idx).offset_of(addr)
        })
    }
}

impl BusSlave for AddressMapper {
    fn try_request(&mut self, req: BusRequest) -> bool {
        let mapped = BusRequest {
            addr: self.translate(req.addr),
            ..req
        };
        self.inner.try_request(mapped)
    }

    fn take_response(&mut self) -> Option<BusResponse> {
        self.inner.take_response()
    }

    fn tick(&mut self) {
        self.inner.tick();
    }
}
