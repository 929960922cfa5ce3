//! 1-to-N address decode.
//!
//! A decode table binds each of N slave ports to one address range. The
//! table is validated once at configuration time (non-empty, sorted,
//! mutually disjoint); per-transaction selection is then a binary search
//! that claims exactly one slave. The fallback for an address no range
//! claims is configurable: route to slave 0 as a catch-all sink, or answer
//! permissively (reads return zero, writes complete and are dropped).

use tracing::trace;

use super::port::BusSlave;
use super::transaction::{BusRequest, BusResponse};
use crate::common::{AddressRange, ConfigError};

/// Validated address-to-slave-index decode table.
///
/// Shared by [`AddressDecoder`] and by routers that dispatch to ports they
/// do not own (the MMIO partition in the topology layer).
#[derive(Clone, Debug)]
pub struct AddressMap {
    ranges: Vec<AddressRange>,
}

impl AddressMap {
    /// Builds a decode table, sorting the ranges by base address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSlaves`] for an empty table,
    /// [`ConfigError::EmptyRange`] for a zero-size window, and
    /// [`ConfigError::OverlappingRanges`] if any two windows share an
    /// address.
    pub fn new(mut ranges: Vec<AddressRange>) -> Result<Self, ConfigError> {
        if ranges.is_empty() {
            return Err(ConfigError::NoSlaves);
        }
        for range in &ranges {
            if range.size == 0 {
                return Err(ConfigError::EmptyRange(range.base));
            }
        }
        ranges.sort_by_key(|r| r.base);
        for pair in ranges.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(ConfigError::OverlappingRanges(pair[0], pair[1]));
            }
        }
        Ok(Self { ranges })
    }

    /// Returns the index of the unique range containing `addr`, if any.
    pub fn decode(&self, addr: u64) -> Option<usize> {
        let idx = match self.ranges.binary_search_by_key(&addr, |r| r.base) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        self.ranges[idx].contains(addr).then_some(idx)
    }

    /// Returns the range at a decode index.
    pub fn range(&self, idx: usize) -> AddressRange {
        self.ranges[idx]
    }

    /// Returns the number of ranges in the table.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns whether the table is empty (never true for a built table).
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Fallback policy for addresses no configured range claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DecoderFallback {
    /// Answer permissively without touching any slave: reads return zero,
    /// writes complete with okay status and are dropped.
    #[default]
    ReadZero,
    /// Forward to slave 0 as the catch-all sink.
    SlaveZero,
}

/// Where the decoder's in-flight transaction went.
#[derive(Debug)]
enum Route {
    Slave(usize),
    Synthesized(BusResponse),
}

/// One master port decoded onto N range-selected slave ports.
///
/// Exactly one request may be outstanding at a time; the response is
/// forwarded back unmodified from the slave that claimed the address.
pub struct AddressDecoder {
    map: AddressMap,
    slaves: Vec<Box<dyn BusSlave>>,
    fallback: DecoderFallback,
    in_flight: Option<Route>,
}

impl AddressDecoder {
    /// Builds a decoder from `(range, slave)` bindings.
    ///
    /// # Errors
    ///
    /// Propagates the table validation errors of [`AddressMap::new`].
    pub fn new(
        entries: Vec<(AddressRange, Box<dyn BusSlave>)>,
        fallback: DecoderFallback,
    ) -> Result<Self, ConfigError> {
        let mut paired: Vec<_> = entries.into_iter().collect();
        paired.sort_by_key(|(range, _)| range.base);
        let (ranges, slaves): (Vec<_>, Vec<_>) = paired.into_iter().unzip();
        let map = AddressMap::new(ranges)?;
        Ok(Self {
            map,
            slaves,
            fallback,
            in_flight: None,
        })
    }

    /// Returns the decode index `addr` would route to, if any.
    pub fn decode(&self, addr: u64) -> Option<usize> {
        self.map.decode(addr)
    }
}

impl BusSlave for AddressDecoder {
    fn try_request(&mut self, req: BusRequest) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        let target = match self.map.decode(req.addr) {
            Some(idx) => idx,
            None => match self.fallback {
                DecoderFallback::SlaveZero => 0,
                DecoderFallback::ReadZero => {
                    trace!(addr = req.addr, "unmapped access answered permissively");
                    self.in_flight = Some(Route::Synthesized(BusResponse::ZERO));
                    return true;
                }
            },
        };
        if self.slaves[target].try_request(req) {
            trace!(addr = req.addr, slave = target, "decoded request");
            self.in_flight = Some(Route::Slave(target));
            true
        } else {
            false
        }
    }

    fn take_response(&mut self) -> Option<BusResponse> {
        let resp = match self.in_flight.as_ref()? {
            Route::Slave(idx) => self.slaves[*idx].take_response()?,
            Route::Synthesized(resp) => *resp,
        };
        self.in_flight = None;
        Some(resp)
    }

    fn tick(&mut self) {
        for slave in &mut self.slaves {
            slave.tick();
        }
    }
}
