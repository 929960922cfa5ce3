//! Next-line prefetcher.
//!
//! Spliced between the merge point and the shared cache, the prefetcher
//! translates the demand stream into a prefetch-augmented stream: after a
//! demand read of address A it issues a read of the next line while the
//! path is otherwise idle, warming the cache below it. Prefetch responses
//! are consumed and discarded; demand traffic always takes priority for
//! the next free slot.

use crate::bus::{AccessKind, BusRequest, BusResponse, BusSlave};
use crate::coherence::LINE_SHIFT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InFlight {
    Demand,
    Prefetch,
}

/// Degree-1 next-line prefetcher over an inner port.
pub struct NextLinePrefetcher {
    inner: Box<dyn BusSlave>,
    in_flight: Option<InFlight>,
    /// Line-aligned address queued for prefetch after the last demand read.
    candidate: Option<u64>,
    response: Option<BusResponse>,
}

impl NextLinePrefetcher {
    /// Creates a prefetcher over the inner port.
    pub fn new(inner: Box<dyn BusSlave>) -> Self {
        Self {
            inner,
            in_flight: None,
            candidate: None,
            response: None,
        }
    }
}

impl BusSlave for NextLinePrefetcher {
    fn try_request(&mut self, req: BusRequest) -> bool {
        // One outstanding: an active prefetch backpressures demand briefly.
        if self.in_flight.is_some() || self.response.is_some() {
            return false;
        }
        if !self.inner.try_request(req) {
            return false;
        }
        self.in_flight = Some(InFlight::Demand);
        if req.kind == AccessKind::Read {
            let line_base = req.addr & !((1 << LINE_SHIFT) - 1);
            self.candidate = Some(line_base.wrapping_add(1 << LINE_SHIFT));
        }
        true
    }

    fn take_response(&mut self) -> Option<BusResponse> {
        self.response.take()
    }

    fn tick(&mut self) {
        self.inner.tick();
        match self.in_flight {
            Some(InFlight::Demand) => {
                if let Some(resp) = self.inner.take_response() {
                    self.response = Some(resp);
                    self.in_flight = None;
                }
            }
            Some(InFlight::Prefetch) => {
                // Discard: the point was the fill below us.
                if self.inner.take_response().is_some() {
                    self.in_flight = None;
                }
            }
            None => {
                if let Some(addr) = self.candidate {
                    if self.inner.try_request(BusRequest::read(addr)) {
                        self.candidate = None;
                        self.in_flight = Some(InFlight::Prefetch);
                    }
                }
            }
        }
    }
}
