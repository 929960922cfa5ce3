//! Shared test infrastructure.
//!
//! The central mock here is [`EchoSlave`], a slave port that records every
//! request it accepts and answers reads by echoing the request address as
//! data. Echoing makes routing failures observable: a response carrying
//! the wrong address means the fabric steered the transaction to the wrong
//! place, without the test having to preload a memory image.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use rvfabric_core::bus::{AccessKind, BusRequest, BusResponse, BusSlave};

static TRACING: Once = Once::new();

/// Installs the tracing subscriber once for the whole test binary.
///
/// Honors `RUST_LOG`, so `RUST_LOG=trace cargo test -- --nocapture` shows
/// the fabric's routing and probe events while a test runs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Shared handle to a mock's accepted-request log.
pub type RequestLog = Rc<RefCell<Vec<BusRequest>>>;

/// Returns the addresses in a request log, in acceptance order.
pub fn logged_addrs(log: &RequestLog) -> Vec<u64> {
    log.borrow().iter().map(|req| req.addr).collect()
}

/// A recording slave port with fixed latency and optional backpressure.
///
/// Reads complete with the request address echoed as data; writes complete
/// with zero. The first `refusals` requests are refused to exercise the
/// hold-and-re-present contract of the masters above.
pub struct EchoSlave {
    log: RequestLog,
    latency: u64,
    refusals: u64,
    pending: Option<(BusRequest, u64)>,
    response: Option<BusResponse>,
}

impl EchoSlave {
    /// Creates a mock answering after `latency` clocks.
    pub fn new(latency: u64) -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            latency,
            refusals: 0,
            pending: None,
            response: None,
        }
    }

    /// Creates a mock that refuses its first `refusals` requests.
    pub fn with_refusals(latency: u64, refusals: u64) -> Self {
        Self {
            refusals,
            ..Self::new(latency)
        }
    }

    /// Returns a shared handle to the accepted-request log.
    pub fn log(&self) -> RequestLog {
        Rc::clone(&self.log)
    }
}

impl BusSlave for EchoSlave {
    fn try_request(&mut self, req: BusRequest) -> bool {
        if self.refusals > 0 {
            self.refusals -= 1;
            return false;
        }
        if self.pending.is_some() || self.response.is_some() {
            return false;
        }
        self.log.borrow_mut().push(req);
        self.pending = Some((req, self.latency));
        true
    }

    fn take_response(&mut self) -> Option<BusResponse> {
        self.response.take()
    }

    fn tick(&mut self) {
        if let Some((req, cycles)) = self.pending {
            if cycles <= 1 {
                self.pending = None;
                self.response = Some(match req.kind {
                    AccessKind::Read => BusResponse::okay(req.addr),
                    AccessKind::Write => BusResponse::okay(0),
                });
            } else {
                self.pending = Some((req, cycles - 1));
            }
        }
    }
}

/// Clocks `port` until its response arrives, up to `limit` ticks.
///
/// # Panics
///
/// Panics if no response arrives within the limit; a stalled transaction
/// is always a test failure.
pub fn run_until_response(port: &mut dyn BusSlave, limit: u32) -> BusResponse {
    for _ in 0..limit {
        port.tick();
        if let Some(resp) = port.take_response() {
            return resp;
        }
    }
    panic!("no response within {limit} ticks");
}
