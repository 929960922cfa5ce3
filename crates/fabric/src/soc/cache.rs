//! Shared cache on the merged memory path.
//!
//! A transaction-level last-level cache: direct-mapped over bus-word lines,
//! write-through, presenting the same request/response shape on both faces.
//! Replacement sophistication is deliberately absent; the interesting
//! behavior here is the interface contract (hits answered locally after the
//! configured latency, misses filled from the inner port).

use crate::bus::{AccessKind, BusRequest, BusResponse, BusSlave};
use crate::coherence::LINE_SHIFT;

#[derive(Clone, Copy, Debug)]
struct CacheLine {
    tag: u64,
    data: u64,
}

#[derive(Debug)]
enum Pending {
    /// Hit being served after the access latency.
    Hit { data: u64, cycles: u64 },
    /// Read miss forwarded to the inner port; fills on response.
    Fill { set: usize, tag: u64 },
    /// Write forwarded to the inner port (write-through).
    Store,
}

/// Direct-mapped write-through shared cache.
pub struct SharedCache {
    sets: Vec<Option<CacheLine>>,
    latency: u64,
    inner: Box<dyn BusSlave>,
    pending: Option<Pending>,
    response: Option<BusResponse>,
    /// Demand hits observed; exposed for tests and diagnostics.
    pub hits: u64,
    /// Demand misses observed.
    pub misses: u64,
}

impl SharedCache {
    /// Creates a cache of `size_bytes` capacity (rounded down to whole
    /// bus-word lines) over the inner port.
    pub fn new(size_bytes: usize, latency: u64, inner: Box<dyn BusSlave>) -> Self {
        let lines = usize::max(1, size_bytes >> LINE_SHIFT);
        Self {
            sets: vec![None; lines],
            latency,
            inner,
            pending: None,
            response: None,
            hits: 0,
            misses: 0,
        }
    }

    fn index(&self, addr: u64) -> (usize, u64) {
        let line = addr >> LINE_SHIFT;
        ((line as usize) % self.sets.len(), line)
    }

    fn lookup(&self, addr: u64) -> Option<u64> {
        let (set, tag) = self.index(addr);
        self.sets[set]
            .as_ref()
            .filter(|l| l.tag == tag)
            .map(|l| l.data)
    }
}

impl BusSlave for SharedCache {
    fn try_request(&mut self, req: BusRequest) -> bool {
        if self.pending.is_some() || self.response.is_some() {
            return false;
        }
        match req.kind {
            AccessKind::Read => {
                if let Some(data) = self.lookup(req.addr) {
                    self.hits += 1;
                    self.pending = Some(Pending::Hit {
                        data,
                        cycles: self.latency,
                    });
                    return true;
                }
                if !self.inner.try_request(req) {
                    return false;
                }
                self.misses += 1;
                let (set, tag) = self.index(req.addr);
                self.pending = Some(Pending::Fill { set, tag });
                true
            }
            AccessKind::Write => {
                if !self.inner.try_request(req) {
                    return false;
                }
                // Write-through: refresh a present line, never allocate.
                let (set, tag) = self.index(req.addr);
                if let Some(line) = self.sets[set].as_mut() {
                    if line.tag == tag {
                        line.data = req.mask.merge64(line.data, req.data);
                    }
                }
                self.pending = Some(Pending::Store);
                true
            }
        }
    }

    fn take_response(&mut self) -> Option<BusResponse> {
        self.response.take()
    }

    fn tick(&mut self) {
        self.inner.tick();
        match self.pending.take() {
            Some(Pending::Hit { data, cycles }) => {
                if cycles <= 1 {
                    self.response = Some(BusResponse::okay(data));
                } else {
                    self.pending = Some(Pending::Hit {
                        data,
                        cycles: cycles - 1,
                    });
                }
            }
            Some(Pending::Fill { set, tag }) => match self.inner.take_response() {
                Some(resp) => {
                    self.sets[set] = Some(CacheLine {
                        tag,
                        data: resp.data,
                    });
                    self.response = Some(resp);
                }
                None => self.pending = Some(Pending::Fill { set, tag }),
            },
            Some(Pending::Store) => match self.inner.take_response() {
                Some(resp) => self.response = Some(resp),
                None => self.pending = Some(Pending::Store),
            },
            None => {}
        }
    }
}
