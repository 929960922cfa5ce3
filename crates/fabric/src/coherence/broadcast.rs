//! Cross-core coherence broadcast.
//!
//! The broadcaster is the single serialization point of the dual-core
//! topology. It latches each hart's merged memory stream into a slot,
//! considers the slots in a fixed deterministic order (slot 0 strictly
//! before slot 1), and consults a sharing directory before forwarding a
//! request downstream. A request that conflicts with a remote copy first
//! raises a probe; the request is held until the probe is acknowledged, so
//! at most one hart ever holds writable state on a line. The probed hart's
//! own access to the contested line, if already latched, drains ahead of
//! the probe, so the acknowledge never waits on a request the broadcaster
//! itself is holding back.
//!
//! The broadcaster owns no cache-line data, only the ordering of probe
//! traffic and the directory mirroring which hart holds what.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{LineState, ProbeKind, line_of};
use crate::bus::port::BusSlave;
use crate::bus::transaction::{AccessKind, BusRequest, BusResponse};

/// An outstanding probe raised on behalf of a blocked slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeOp {
    /// Hart whose copy must transition.
    pub target: usize,
    /// Line index being probed.
    pub line: u64,
    /// Transition requested.
    pub kind: ProbeKind,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<BusRequest>,
    response: Option<BusResponse>,
}

/// Serializes two harts' merged streams over one downstream port.
pub struct CoherenceBroadcaster {
    slots: Vec<Slot>,
    /// Per-line holder states, indexed by slot.
    directory: HashMap<u64, Vec<LineState>>,
    /// Raised probe awaiting acknowledgement from its target domain.
    probe: Option<ProbeOp>,
    /// `(slot, line, kind)` of the request in flight downstream.
    in_flight: Option<(usize, u64, AccessKind)>,
    downstream: Box<dyn BusSlave>,
}

impl CoherenceBroadcaster {
    /// Creates a broadcaster for `harts` slots over the given downstream
    /// port.
    pub fn new(harts: usize, downstream: Box<dyn BusSlave>) -> Self {
        let mut slots = Vec::with_capacity(harts);
        for _ in 0..harts {
            slots.push(Slot::default());
        }
        Self {
            slots,
            directory: HashMap::new(),
            probe: None,
            in_flight: None,
            downstream,
        }
    }

    /// Latches a request from hart `slot`; `false` while the slot's
    /// previous transaction is draining.
    pub fn try_request(&mut self, slot: usize, req: BusRequest) -> bool {
        let s = &mut self.slots[slot];
        if s.pending.is_some()
            || s.response.is_some()
            || self.in_flight.is_some_and(|(f, _, _)| f == slot)
        {
            return false;
        }
        s.pending = Some(req);
        true
    }

    /// Takes the response destined for hart `slot`, if ready.
    pub fn take_response(&mut self, slot: usize) -> Option<BusResponse> {
        self.slots[slot].response.take()
    }

    /// The probe currently awaiting acknowledgement, if any.
    pub fn pending_probe(&self) -> Option<ProbeOp> {
        self.probe
    }

    /// Records that the probed domain acknowledged; the directory drops or
    /// demotes the remote copy and the blocked request may proceed next
    /// cycle.
    pub fn probe_acked(&mut self) {
        if let Some(op) = self.probe.take() {
            let entry = self.entry_mut(op.line);
            entry[op.target] = match op.kind {
                ProbeKind::Invalidate => LineState::Invalid,
                ProbeKind::Downgrade => LineState::Shared,
            };
            debug!(target = op.target, line = op.line, kind = ?op.kind, "probe completed");
        }
    }

    /// Directory state of `line` for `slot` (what that hart may hold).
    pub fn holder_state(&self, line: u64, slot: usize) -> LineState {
        self.directory
            .get(&line)
            .map_or(LineState::Invalid, |e| e[slot])
    }

    fn entry_mut(&mut self, line: u64) -> &mut Vec<LineState> {
        let harts = self.slots.len();
        self.directory
            .entry(line)
            .or_insert_with(|| vec![LineState::Invalid; harts])
    }

    /// Probe needed before `slot`'s access to `line` may proceed, if any.
    fn conflict(&self, slot: usize, line: u64, kind: AccessKind) -> Option<ProbeOp> {
        let entry = self.directory.get(&line)?;
        for (other, state) in entry.iter().enumerate() {
            if other == slot {
                continue;
            }
            let probe = match (kind, state) {
                (AccessKind::Write, LineState::Shared | LineState::Exclusive) => {
                    Some(ProbeKind::Invalidate)
                }
                (AccessKind::Read, LineState::Exclusive) => Some(ProbeKind::Downgrade),
                _ => None,
            };
            if let Some(kind) = probe {
                return Some(ProbeOp {
                    target: other,
                    line,
                    kind,
                });
            }
        }
        None
    }

    /// Forwards the probe target's pending access to the probed line, if
    /// it holds one and that access is itself conflict-free.
    fn forward_probe_target(&mut self, op: ProbeOp) {
        let Some(req) = self.slots[op.target].pending else {
            return;
        };
        let line = line_of(req.addr);
        if line != op.line || self.conflict(op.target, line, req.kind).is_some() {
            return;
        }
        if self.downstream.try_request(req) {
            trace!(slot = op.target, line, "probe target drains ahead of probe");
            self.slots[op.target].pending = None;
            self.in_flight = Some((op.target, line, req.kind));
        }
    }

    /// Advances the broadcaster one clock: retires the in-flight
    /// transaction, then serializes the slots in fixed order, raising a
    /// probe or forwarding downstream.
    pub fn tick(&mut self) {
        self.downstream.tick();

        if let Some((slot, line, kind)) = self.in_flight {
            if let Some(resp) = self.downstream.take_response() {
                self.slots[slot].response = Some(resp);
                self.in_flight = None;
                let entry = self.entry_mut(line);
                entry[slot] = match kind {
                    AccessKind::Write => LineState::Exclusive,
                    AccessKind::Read => match entry[slot] {
                        LineState::Exclusive => LineState::Exclusive,
                        LineState::Invalid | LineState::Shared => LineState::Shared,
                    },
                };
            }
        }

        if self.in_flight.is_some() {
            return;
        }

        // A raised probe stalls new issue until its acknowledge arrives,
        // with one exception: the probed hart cannot acknowledge while its
        // own access to the contested line is outstanding, so that access
        // is forwarded ahead of everything else and drains first.
        if let Some(op) = self.probe {
            self.forward_probe_target(op);
            return;
        }

        // Slot 0 strictly before slot 1: deterministic interleaving.
        for slot in 0..self.slots.len() {
            let Some(req) = self.slots[slot].pending else {
                continue;
            };
            let line = line_of(req.addr);
            if let Some(op) = self.conflict(slot, line, req.kind) {
                trace!(slot, line, target = op.target, "conflict raises probe");
                self.probe = Some(op);
                break;
            }
            if self.downstream.try_request(req) {
                self.slots[slot].pending = None;
                self.in_flight = Some((slot, line, req.kind));
            }
            break;
        }
    }
}

/// Adapter presenting one broadcaster slot as a plain slave port, so a
/// hart's merge point can sit directly on top of the shared broadcaster.
pub struct BroadcastPort {
    shared: Rc<RefCell<CoherenceBroadcaster>>,
    slot: usize,
}

impl BroadcastPort {
    /// Creates the port for hart `slot` over the shared broadcaster.
    pub fn new(shared: Rc<RefCell<CoherenceBroadcaster>>, slot: usize) -> Self {
        Self { shared, slot }
    }
}

impl BusSlave for BroadcastPort {
    fn try_request(&mut self, req: BusRequest) -> bool {
        self.shared.borrow_mut().try_request(self.slot, req)
    }

    fn take_response(&mut self) -> Option<BusResponse> {
        self.shared.borrow_mut().take_response(self.slot)
    }

    fn tick(&mut self) {
        // The topology clocks the shared broadcaster exactly once per
        // cycle; ticking it from every slot would double-step it.
    }
}
