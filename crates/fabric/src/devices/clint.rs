//! Timer and software interrupt controller (CLINT-equivalent).
//!
//! The controller owns a free-running time counter driven by a configurable
//! divider, per-hart compare registers producing a level-sensitive timer
//! interrupt, and per-hart software-interrupt registers.
//!
//! # Memory Map
//!
//! * `0x0000 + 4h`: MSIP for hart `h` (32-bit; nonzero means pending)
//! * `0x4000 + 8h`: MTIMECMP for hart `h` (64-bit, two word cells)
//! * `0x8000`: FREQ (16-bit divider period, ticks per MTIME increment)
//! * `0x8008`: INC (16-bit MTIME increment per divider wrap)
//! * `0xBFF8`: MTIME (64-bit free-running counter)
//!
//! Both interrupt outputs are registered: the comparison (or the MSIP
//! nonzero test) taken this cycle appears on the output line one cycle
//! later, so the lines never glitch combinationally.

use tracing::debug;

use crate::common::ConfigError;
use crate::config::TimerConfig;
use crate::regbank::{Register, RegisterBank};

/// Offset of the first per-hart MSIP register.
const MSIP_BASE: u64 = 0x0000;
/// Offset of the first per-hart MTIMECMP register.
const MTIMECMP_BASE: u64 = 0x4000;
/// Offset of the divider period register.
const FREQ_OFFSET: u64 = 0x8000;
/// Offset of the increment-step register.
const INC_OFFSET: u64 = 0x8008;
/// Offset of the free-running counter (low word; high word at `+ 4`).
const MTIME_OFFSET: u64 = 0xBFF8;

/// Timer/software-interrupt controller servicing a fixed set of harts.
#[derive(Debug)]
pub struct MachineTimer {
    bank: RegisterBank,
    harts: usize,
    /// Free-running counter; owned by the device, not a bank cell, because
    /// the update logic advances it every divider wrap.
    mtime: u64,
    /// Divider state, counting clocks up to the FREQ period.
    divider: u64,
    /// Registered timer interrupt line per hart.
    mtip: Vec<bool>,
    mtip_next: Vec<bool>,
    /// Registered software interrupt line per hart.
    ssip: Vec<bool>,
    ssip_next: Vec<bool>,
    /// Simulation acceleration: while the serviced core reports idle,
    /// advance MTIME by a large jump instead of running the divider.
    fast_wfi: bool,
    wfi_jump: u64,
    idle: bool,
}

impl MachineTimer {
    /// Creates a controller servicing `harts` harts with the configured
    /// reset values for FREQ and INC.
    ///
    /// # Errors
    ///
    /// Propagates register-map construction errors; with distinct per-hart
    /// offsets these cannot occur for a supported hart count.
    pub fn new(harts: usize, cfg: &TimerConfig) -> Result<Self, ConfigError> {
        let mut bank = RegisterBank::new();
        for h in 0..harts as u64 {
            bank.map(MSIP_BASE + 4 * h, Register::new(0))?;
            bank.map(MTIMECMP_BASE + 8 * h, Register::new(u32::MAX))?;
            bank.map(MTIMECMP_BASE + 8 * h + 4, Register::new(u32::MAX))?;
        }
        bank.map(FREQ_OFFSET, Register::narrow(u32::from(cfg.freq_reset), 16))?;
        bank.map(INC_OFFSET, Register::narrow(u32::from(cfg.inc_reset), 16))?;
        Ok(Self {
            bank,
            harts,
            mtime: 0,
            divider: 0,
            mtip: vec![false; harts],
            mtip_next: vec![false; harts],
            ssip: vec![false; harts],
            ssip_next: vec![false; harts],
            fast_wfi: cfg.fast_wfi,
            wfi_jump: cfg.wfi_jump,
            idle: false,
        })
    }

    /// Number of harts this instance services.
    pub fn harts(&self) -> usize {
        self.harts
    }

    /// Current value of the free-running counter.
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Registered timer interrupt line for hart `hart`.
    pub fn timer_irq(&self, hart: usize) -> bool {
        self.mtip[hart]
    }

    /// Registered software interrupt line for hart `hart`.
    pub fn software_irq(&self, hart: usize) -> bool {
        self.ssip[hart]
    }

    /// Reports whether the serviced core is idle (waiting for interrupt).
    ///
    /// Only observed when `fast_wfi` is configured; this is a simulation
    /// acceleration hook, not part of the functional contract.
    pub fn set_idle(&mut self, idle: bool) {
        self.idle = idle;
    }

    /// Reads the word at `offset` with register side effects applied.
    pub fn read_word(&mut self, offset: u64) -> u32 {
        match offset {
            MTIME_OFFSET => self.mtime as u32,
            o if o == MTIME_OFFSET + 4 => (self.mtime >> 32) as u32,
            _ => self.bank.read(offset),
        }
    }

    /// Writes the word at `offset` under a 4-lane byte mask.
    pub fn write_word(&mut self, offset: u64, value: u32, lane_mask: u8) {
        match offset {
            MTIME_OFFSET => self.mtime = merge_word(self.mtime, value, lane_mask, 0),
            o if o == MTIME_OFFSET + 4 => {
                self.mtime = merge_word(self.mtime, value, lane_mask, 32);
            }
            _ => self.bank.write(offset, value, lane_mask),
        }
    }

    fn mtimecmp(&self, hart: usize) -> u64 {
        self.bank.peek64(MTIMECMP_BASE + 8 * hart as u64)
    }

    fn msip(&self, hart: usize) -> u32 {
        self.bank.peek(MSIP_BASE + 4 * hart as u64)
    }

    /// Advances the controller by one clock.
    ///
    /// The divider counts up every clock; when it reaches FREQ it resets and
    /// MTIME advances by INC in the same step. A FREQ of zero advances MTIME
    /// every clock. All counters wrap modularly.
    pub fn tick(&mut self) {
        // Output registers latch last cycle's comparisons first.
        for h in 0..self.harts {
            self.mtip[h] = self.mtip_next[h];
            self.ssip[h] = self.ssip_next[h];
        }

        if self.fast_wfi && self.idle {
            // Fast-forward idle-wait loops in simulation.
            self.mtime = self.mtime.wrapping_add(self.wfi_jump);
            self.divider = 0;
        } else {
            self.divider += 1;
            if self.divider >= u64::from(self.bank.peek(FREQ_OFFSET)) {
                self.divider = 0;
                let inc = u64::from(self.bank.peek(INC_OFFSET));
                self.mtime = self.mtime.wrapping_add(inc);
            }
        }

        for h in 0..self.harts {
            let fire = self.mtime >= self.mtimecmp(h);
            if fire && !self.mtip_next[h] {
                debug!(hart = h, mtime = self.mtime, "timer comparison hit");
            }
            self.mtip_next[h] = fire;
            self.ssip_next[h] = self.msip(h) != 0;
        }
    }
}

/// Byte-masked merge of a 32-bit write into one half of a 64-bit value.
fn merge_word(old: u64, value: u32, lane_mask: u8, shift: u32) -> u64 {
    let mut out = old;
    for lane in 0..4u32 {
        if (lane_mask >> lane) & 1 == 0 {
            continue;
        }
        let bit = shift + lane * 8;
        out = (out & !(0xFFu64 << bit)) | ((u64::from(value >> (lane * 8)) & 0xFF) << bit);
    }
    out
}
