//! N-to-1 request arbitration.
//!
//! The arbiter merges several master ports into one slave port. Each slot
//! latches at most one request; every clock at most one latched request is
//! forwarded downstream, and the eventual response is steered back to the
//! slot that issued it. The cross-core coherence broadcaster relies on the
//! fixed policy (slot 0 strictly before slot 1) for reproducible
//! interleaving of a given input trace.

use tracing::trace;

use super::port::BusSlave;
use super::transaction::{BusRequest, BusResponse};

/// Slot selection policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ArbiterPolicy {
    /// Deterministic fixed priority: the lowest-numbered slot with a
    /// latched request wins every cycle.
    #[default]
    FixedSlot,
    /// Rotating priority starting after the last slot served.
    RoundRobin,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<BusRequest>,
    response: Option<BusResponse>,
}

/// N master ports merged into one downstream slave port.
///
/// Ready/valid backpressure is honored on both faces: a slot refuses a new
/// request while it still holds one (or an untaken response), and a latched
/// request stays latched until the downstream port accepts it.
pub struct BusArbiter {
    slots: Vec<Slot>,
    downstream: Box<dyn BusSlave>,
    policy: ArbiterPolicy,
    /// Slot whose request is in flight downstream.
    in_flight: Option<usize>,
    /// Next slot to consider first under round-robin.
    rr_next: usize,
}

impl BusArbiter {
    /// Creates an arbiter with `num_slots` master ports.
    pub fn new(num_slots: usize, downstream: Box<dyn BusSlave>, policy: ArbiterPolicy) -> Self {
        let mut slots = Vec::with_capacity(num_slots);
        for _ in 0..num_slots {
            slots.push(Slot::default());
        }
        Self {
            slots,
            downstream,
            policy,
            in_flight: None,
            rr_next: 0,
        }
    }

    /// Offers a request on master port `slot`; returns `false` while the
    /// slot's previous transaction is still draining.
    pub fn try_request(&mut self, slot: usize, req: BusRequest) -> bool {
        let s = &mut self.slots[slot];
        if s.pending.is_some() || s.response.is_some() || self.in_flight == Some(slot) {
            return false;
        }
        s.pending = Some(req);
        true
    }

    /// Takes the response destined for master port `slot`, if ready.
    pub fn take_response(&mut self, slot: usize) -> Option<BusResponse> {
        self.slots[slot].response.take()
    }

    /// Advances the arbiter and its downstream port by one clock.
    pub fn tick(&mut self) {
        self.downstream.tick();

        // Retire the in-flight transaction to its issuing slot only.
        if let Some(slot) = self.in_flight {
            if let Some(resp) = self.downstream.take_response() {
                self.slots[slot].response = Some(resp);
                self.in_flight = None;
            }
        }

        if self.in_flight.is_some() {
            return;
        }
        for slot in self.schedule() {
            let Some(req) = self.slots[slot].pending else {
                continue;
            };
            if self.downstream.try_request(req) {
                trace!(slot, addr = req.addr, "arbiter granted slot");
                self.slots[slot].pending = None;
                self.in_flight = Some(slot);
                self.rr_next = (slot + 1) % self.slots.len();
            }
            // Downstream busy: hold the request latched and keep order.
            break;
        }
    }

    /// Slot visit order for this cycle under the configured policy.
    fn schedule(&self) -> Vec<usize> {
        let n = self.slots.len();
        match self.policy {
            ArbiterPolicy::FixedSlot => (0..n).collect(),
            ArbiterPolicy::RoundRobin => (0..n).map(|i| (self.rr_next + i) % n).collect(),
        }
    }
}
