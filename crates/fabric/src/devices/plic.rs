//! External interrupt controller.
//!
//! The controller accepts a raw vector of external interrupt request lines,
//! double-registers it (two-cycle synchronization), and presents one
//! resolved "external interrupt pending" line per hart context. Gating is
//! the standard source-priority / context-enable / context-threshold model
//! with claim/complete handshaking.
//!
//! # Memory Map
//!
//! * `0x000000 + 4s`: priority of source `s`
//! * `0x001000`: pending bitmap (read-only)
//! * `0x002000 + 0x80·c`: enable word for context `c`
//! * `0x200000 + 0x1000·c`: threshold for context `c`; claim/complete at `+ 4`
//!
//! Source 0 is reserved and never pends, as in the reference platforms.

use tracing::debug;

use crate::common::ConfigError;
use crate::regbank::{Register, RegisterBank};

/// Base offset for per-source priority registers.
const PRIORITY_BASE: u64 = 0x000000;
/// Offset of the pending bitmap.
const PENDING_OFFSET: u64 = 0x001000;
/// Base offset for per-context enable words.
const ENABLE_BASE: u64 = 0x002000;
/// Stride between contexts in the enable region.
const ENABLE_STRIDE: u64 = 0x80;
/// Base offset for per-context threshold/claim registers.
const CONTEXT_BASE: u64 = 0x200000;
/// Stride between contexts in the threshold/claim region.
const CONTEXT_STRIDE: u64 = 0x1000;

/// External interrupt controller with one context per hart.
#[derive(Debug)]
pub struct ExternalInterruptController {
    bank: RegisterBank,
    sources: usize,
    contexts: usize,
    /// Raw request lines as last driven by the outside world.
    raw: u32,
    /// Two-stage input synchronizer; `sync[1]` is the resolved level.
    sync: [u32; 2],
    /// Latched pending bits; cleared by claim.
    pending: u32,
    /// Claim register value per context, refreshed every clock.
    claims: Vec<u32>,
    /// Resolved external interrupt line per context.
    ext_irq: Vec<bool>,
}

impl ExternalInterruptController {
    /// Creates a controller with `sources` request lines and `contexts`
    /// hart contexts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TooManyIrqSources`] if the source count does
    /// not fit the single-word pending bitmap (31 usable sources; source 0
    /// is reserved).
    pub fn new(sources: usize, contexts: usize) -> Result<Self, ConfigError> {
        if sources > 31 {
            return Err(ConfigError::TooManyIrqSources(sources));
        }
        let mut bank = RegisterBank::new();
        for s in 1..=sources as u64 {
            bank.map(PRIORITY_BASE + 4 * s, Register::new(0))?;
        }
        for c in 0..contexts as u64 {
            bank.map(ENABLE_BASE + ENABLE_STRIDE * c, Register::new(0))?;
            bank.map(CONTEXT_BASE + CONTEXT_STRIDE * c, Register::new(0))?;
        }
        Ok(Self {
            bank,
            sources,
            contexts,
            raw: 0,
            sync: [0; 2],
            pending: 0,
            claims: vec![0; contexts],
            ext_irq: vec![false; contexts],
        })
    }

    /// Drives the raw external interrupt request lines.
    pub fn set_inputs(&mut self, vector: u32) {
        self.raw = vector;
    }

    /// Resolved external interrupt line for hart context `hart`.
    pub fn external_irq(&self, hart: usize) -> bool {
        self.ext_irq[hart]
    }

    /// Reads the word at `offset`; reading a claim register claims the
    /// highest-priority pending source and clears its pending bit.
    pub fn read_word(&mut self, offset: u64) -> u32 {
        if offset == PENDING_OFFSET {
            return self.pending;
        }
        if offset >= CONTEXT_BASE {
            let ctx = ((offset - CONTEXT_BASE) / CONTEXT_STRIDE) as usize;
            if ctx < self.contexts && offset % CONTEXT_STRIDE == 4 {
                let claim = self.claims[ctx];
                if claim != 0 {
                    self.pending &= !(1 << claim);
                    debug!(ctx, source = claim, "interrupt claimed");
                }
                return claim;
            }
        }
        self.bank.read(offset)
    }

    /// Writes the word at `offset` under a 4-lane byte mask; writing a
    /// claim register completes the handshake for that context.
    pub fn write_word(&mut self, offset: u64, value: u32, lane_mask: u8) {
        if offset >= CONTEXT_BASE {
            let ctx = ((offset - CONTEXT_BASE) / CONTEXT_STRIDE) as usize;
            if ctx < self.contexts && offset % CONTEXT_STRIDE == 4 {
                // Complete: the source may pend again on the next sync.
                self.claims[ctx] = 0;
                return;
            }
        }
        self.bank.write(offset, value, lane_mask);
    }

    /// Advances the controller by one clock: shifts the input synchronizer,
    /// latches newly pending sources, and recomputes the per-context
    /// resolved lines and claim candidates.
    pub fn tick(&mut self) {
        self.sync[1] = self.sync[0];
        self.sync[0] = self.raw;
        let usable = ((1u64 << (self.sources + 1)) - 2) as u32;
        self.pending |= self.sync[1] & usable;

        for ctx in 0..self.contexts {
            let (best, best_prio) = self.best_source(ctx);
            self.ext_irq[ctx] = best != 0 && best_prio > self.threshold(ctx);
            self.claims[ctx] = if self.ext_irq[ctx] { best } else { 0 };
        }
    }

    fn threshold(&self, ctx: usize) -> u32 {
        self.bank.peek(CONTEXT_BASE + CONTEXT_STRIDE * ctx as u64)
    }

    fn enables(&self, ctx: usize) -> u32 {
        self.bank.peek(ENABLE_BASE + ENABLE_STRIDE * ctx as u64)
    }

    /// Highest-priority enabled pending source for a context, and its
    /// priority. Returns source 0 when nothing pends.
    fn best_source(&self, ctx: usize) -> (u32, u32) {
        let active = self.pending & self.enables(ctx);
        let mut best = 0;
        let mut best_prio = 0;
        for s in 1..=self.sources as u32 {
            if (active >> s) & 1 == 0 {
                continue;
            }
            let prio = self.bank.peek(PRIORITY_BASE + 4 * u64::from(s));
            if prio > best_prio {
                best_prio = prio;
                best = s;
            }
        }
        (best, best_prio)
    }
}
