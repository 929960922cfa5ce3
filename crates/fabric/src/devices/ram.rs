//! Fixed-latency backing memory.
//!
//! The bundled outer-bus collaborator: a byte array behind the slave port
//! contract with a configurable fixed response latency. Accesses past the
//! end of the array follow the permissive convention (reads return zero,
//! writes are dropped) so probing traffic never faults.

use crate::bus::{AccessKind, BusRequest, BusResponse, BusSlave};

/// Byte-addressed memory with a fixed latency per transaction.
pub struct Ram {
    data: Vec<u8>,
    latency: u64,
    /// Accepted request counting down to completion.
    pending: Option<(BusRequest, u64)>,
    response: Option<BusResponse>,
}

impl Ram {
    /// Creates a zero-filled memory of `size` bytes answering after
    /// `latency` clocks.
    pub fn new(size: usize, latency: u64) -> Self {
        Self {
            data: vec![0; size],
            latency,
            pending: None,
            response: None,
        }
    }

    /// Copies `bytes` into the array at `offset`, clipped to the array end.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) {
        if offset >= self.data.len() {
            return;
        }
        let end = usize::min(offset + bytes.len(), self.data.len());
        self.data[offset..end].copy_from_slice(&bytes[..end - offset]);
    }

    /// Reads the 64-bit little-endian value at `addr` without a transaction.
    pub fn peek_u64(&self, addr: u64) -> u64 {
        let mut out = 0u64;
        for lane in 0..8u64 {
            out |= u64::from(self.byte_at(addr.wrapping_add(lane))) << (lane * 8);
        }
        out
    }

    fn byte_at(&self, addr: u64) -> u8 {
        usize::try_from(addr)
            .ok()
            .and_then(|i| self.data.get(i).copied())
            .unwrap_or(0)
    }

    fn perform(&mut self, req: BusRequest) -> BusResponse {
        match req.kind {
            AccessKind::Read => BusResponse::okay(self.peek_u64(req.addr)),
            AccessKind::Write => {
                for lane in 0..8u64 {
                    if !req.mask.lane(lane as usize) {
                        continue;
                    }
                    if let Ok(i) = usize::try_from(req.addr.wrapping_add(lane)) {
                        if let Some(slot) = self.data.get_mut(i) {
                            *slot = (req.data >> (lane * 8)) as u8;
                        }
                    }
                }
                BusResponse::okay(0)
            }
        }
    }
}

impl BusSlave for Ram {
    fn try_request(&mut self, req: BusRequest) -> bool {
        if self.pending.is_some() || self.response.is_some() {
            return false;
        }
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
                self.response = Some(self.perform(req));
            } else {
                self.pending = Some((req, cycles - 1));
            }
        }
    }
}
