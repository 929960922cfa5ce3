//! Slave port contract for fabric components.
//!
//! Everything a request can be routed into (memories, caches, decoders,
//! mappers) presents the same port: accept-or-backpressure on the request
//! side, a polled response on the return side, and a once-per-clock `tick`.

use super::transaction::{BusRequest, BusResponse};

/// A slave port with valid/ready-style flow control.
///
/// The discipline is one outstanding transaction per port: an accepted
/// request must produce exactly one response, and the port refuses further
/// requests until that response has been taken. A master whose request is
/// refused must hold it and re-present the identical request.
pub trait BusSlave {
    /// Offers a request to the port.
    ///
    /// Returns `true` if the request was accepted this cycle. `false` is
    /// backpressure, never an error.
    fn try_request(&mut self, req: BusRequest) -> bool;

    /// Takes the response for the in-flight transaction, if it is ready.
    fn take_response(&mut self) -> Option<BusResponse>;

    /// Advances the port's internal state by one clock.
    fn tick(&mut self) {}
}
