//! Per-core coherence management.
//!
//! A [`CoherenceDomain`] sits between one core's private caches and that
//! hart's merge point. It converts core-side accesses into downstream bus
//! transactions, mirrors the sharing state the private data cache is
//! entitled to, and services inbound probes. The instruction side is
//! read-only: probes against it short-circuit to an immediate acknowledge
//! and it never requests ownership.
//!
//! Ordering rule: a probe for line A is not acknowledged while a local
//! fill of A is in flight on the bus, so a remote core can never observe a
//! half-completed line acquisition. A local write that has not yet been
//! serialized never defers a probe: it has modified nothing, and it
//! re-acquires ownership through its own probe round when its turn comes.

use std::collections::HashMap;

use tracing::trace;

use super::{LineState, ProbeKind, ProbeResponse, line_of};
use crate::bus::arbiter::BusArbiter;
use crate::bus::transaction::{AccessKind, BusRequest, BusResponse};

/// Which of the core's two streams a transaction belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemPath {
    /// Instruction fetch (read-only).
    Fetch,
    /// Data loads and stores.
    Data,
}

/// Merge-point slot indices; the fetch stream takes the fixed slot 0.
const SLOT_FETCH: usize = 0;
/// Data stream slot at the merge point.
const SLOT_DATA: usize = 1;

#[derive(Debug, Default)]
struct PathState {
    /// Accepted from the core, not yet issued to the merge point.
    queued: Option<BusRequest>,
    /// In flight on the bus; blocks probes to the same line.
    issued: Option<BusRequest>,
    /// Ready for the core to collect.
    response: Option<BusResponse>,
}

impl PathState {
    fn busy(&self) -> bool {
        self.queued.is_some() || self.issued.is_some() || self.response.is_some()
    }
}

/// One core's coherence manager.
#[derive(Debug)]
pub struct CoherenceDomain {
    hart: usize,
    /// Sharing state mirrored for the private data cache.
    lines: HashMap<u64, LineState>,
    fetch: PathState,
    data: PathState,
}

impl CoherenceDomain {
    /// Creates the manager for hart `hart`.
    pub fn new(hart: usize) -> Self {
        Self {
            hart,
            lines: HashMap::new(),
            fetch: PathState::default(),
            data: PathState::default(),
        }
    }

    /// Hart index this domain is attached to.
    pub fn hart(&self) -> usize {
        self.hart
    }

    /// Sharing state currently mirrored for a line.
    pub fn line_state(&self, line: u64) -> LineState {
        self.lines.get(&line).copied().unwrap_or_default()
    }

    fn path_mut(&mut self, path: MemPath) -> &mut PathState {
        match path {
            MemPath::Fetch => &mut self.fetch,
            MemPath::Data => &mut self.data,
        }
    }

    /// Accepts a core-side access on the given stream.
    ///
    /// One transaction per stream may be outstanding; `false` is
    /// backpressure, and the core must re-present the identical request.
    pub fn try_request(&mut self, path: MemPath, req: BusRequest) -> bool {
        let state = self.path_mut(path);
        if state.busy() {
            return false;
        }
        state.queued = Some(req);
        true
    }

    /// Takes the completed response on the given stream, if ready.
    pub fn take_response(&mut self, path: MemPath) -> Option<BusResponse> {
        self.path_mut(path).response.take()
    }

    /// Moves transactions between the core-side slots and the hart's merge
    /// point: retires finished accesses, then issues queued ones.
    pub fn pump(&mut self, merge: &mut BusArbiter) {
        for (path, slot) in [(MemPath::Fetch, SLOT_FETCH), (MemPath::Data, SLOT_DATA)] {
            if self.path_mut(path).issued.is_some() {
                if let Some(resp) = merge.take_response(slot) {
                    self.complete(path, resp);
                }
            }
            let state = self.path_mut(path);
            if let Some(req) = state.queued {
                if merge.try_request(slot, req) {
                    state.queued = None;
                    state.issued = Some(req);
                }
            }
        }
    }

    /// Records the completion of an issued access and updates the mirrored
    /// sharing state for the data stream.
    fn complete(&mut self, path: MemPath, resp: BusResponse) {
        let state = self.path_mut(path);
        let issued = state.issued.take();
        state.response = Some(resp);
        if path != MemPath::Data {
            return;
        }
        if let Some(req) = issued {
            let line = line_of(req.addr);
            let next = match req.kind {
                // A completed write means the broadcaster granted exclusivity.
                AccessKind::Write => LineState::Exclusive,
                // A read fill keeps exclusivity if already held.
                AccessKind::Read => match self.line_state(line) {
                    LineState::Exclusive => LineState::Exclusive,
                    LineState::Invalid | LineState::Shared => LineState::Shared,
                },
            };
            trace!(hart = self.hart, line, ?next, "line state update");
            let _ = self.lines.insert(line, next);
        }
    }

    /// Whether the data stream has an access to `line` accepted or on the
    /// bus. The topology holds probe delivery on this while the target is
    /// the exclusive holder, so an acknowledge can never race the
    /// completion of the access that earned that exclusivity.
    pub fn data_access_outstanding(&self, line: u64) -> bool {
        let hits = |r: Option<BusRequest>| r.is_some_and(|req| line_of(req.addr) == line);
        hits(self.data.queued) || hits(self.data.issued)
    }

    /// Services an inbound probe against the data-side state.
    ///
    /// The instruction side holds nothing a probe could target, so only the
    /// data stream participates. An in-flight fill of the probed line
    /// defers the acknowledge until it drains; an outstanding write
    /// acknowledges through, since a write that has not been serialized
    /// yet has touched nothing a remote hart could observe.
    pub fn probe(&mut self, line: u64, kind: ProbeKind) -> ProbeResponse {
        let filling = self
            .data
            .issued
            .is_some_and(|req| req.kind == AccessKind::Read && line_of(req.addr) == line);
        if filling {
            trace!(hart = self.hart, line, "probe deferred behind local fill");
            return ProbeResponse::Retry;
        }
        match kind {
            ProbeKind::Invalidate => {
                let _ = self.lines.remove(&line);
            }
            ProbeKind::Downgrade => {
                if let Some(state) = self.lines.get_mut(&line) {
                    if *state == LineState::Exclusive {
                        *state = LineState::Shared;
                    }
                }
            }
        }
        trace!(hart = self.hart, line, ?kind, "probe acknowledged");
        ProbeResponse::Ack
    }
}
