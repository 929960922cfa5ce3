//! Generic memory-mapped register bank.
//!
//! Every control device on the fabric exposes its state through a
//! [`RegisterBank`]: a map from word-aligned offsets to 32-bit register
//! cells. The bank provides:
//! 1. **Word reads** with read-side effects (`ReadClears`) applied atomically.
//! 2. **Byte-masked writes** combined per lane with the register's write
//!    behavior (plain overwrite, write-1-clears, write-1-sets).
//! 3. **Permissive decode:** unmapped offsets read as zero and swallow
//!    writes, matching MMIO convention for probing software.
//!
//! Write behaviors are a closed enum rather than arbitrary closures so the
//! bank's semantics stay exhaustively testable.

use std::collections::BTreeMap;

use crate::common::ConfigError;

/// Write (and read) behavior of a single register cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RegEffect {
    /// A written byte replaces the stored byte.
    #[default]
    Overwrite,
    /// Each written `1` bit clears the corresponding stored bit
    /// (`new = old & !written`). Typical for interrupt-pending registers.
    WriteOneClears,
    /// Each written `1` bit sets the corresponding stored bit
    /// (`new = old | written`).
    WriteOneSets,
    /// Reading the register returns its value and clears it in the same
    /// step. Writes behave as plain overwrite.
    ReadClears,
}

impl RegEffect {
    /// Combines one written byte with the prior byte per this behavior.
    const fn apply(self, old: u8, new: u8) -> u8 {
        match self {
            Self::Overwrite | Self::ReadClears => new,
            Self::WriteOneClears => old & !new,
            Self::WriteOneSets => old | new,
        }
    }
}

/// A 32-bit register cell: current value, implemented-bit mask, and write
/// behavior.
#[derive(Clone, Copy, Debug)]
pub struct Register {
    value: u32,
    /// Bits that are actually implemented; writes outside read as zero.
    width_mask: u32,
    effect: RegEffect,
}

impl Register {
    /// Creates a full-width register with plain-overwrite behavior.
    pub const fn new(reset: u32) -> Self {
        Self {
            value: reset,
            width_mask: u32::MAX,
            effect: RegEffect::Overwrite,
        }
    }

    /// Creates a full-width register with the given write behavior.
    pub const fn with_effect(reset: u32, effect: RegEffect) -> Self {
        Self {
            value: reset,
            width_mask: u32::MAX,
            effect,
        }
    }

    /// Creates a register implementing only the low `bits` bits.
    ///
    /// Narrow platform registers (for example a 16-bit divider period) read
    /// back zero in their unimplemented high bits.
    pub const fn narrow(reset: u32, bits: u32) -> Self {
        let mask = if bits >= 32 { u32::MAX } else { (1 << bits) - 1 };
        Self {
            value: reset & mask,
            width_mask: mask,
            effect: RegEffect::Overwrite,
        }
    }
}

/// A bank of word-addressed register cells.
///
/// Within one bank no two registers occupy the same offset; that invariant
/// is enforced when registers are mapped, not at access time.
#[derive(Debug, Default)]
pub struct RegisterBank {
    regs: BTreeMap<u64, Register>,
}

impl RegisterBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self {
            regs: BTreeMap::new(),
        }
    }

    /// Maps a register at a word-aligned offset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MisalignedRegister`] for a non-word-aligned
    /// offset and [`ConfigError::DuplicateRegister`] if the offset is
    /// already occupied.
    pub fn map(&mut self, offset: u64, reg: Register) -> Result<(), ConfigError> {
        if offset % 4 != 0 {
            return Err(ConfigError::MisalignedRegister(offset));
        }
        if self.regs.contains_key(&offset) {
            return Err(ConfigError::DuplicateRegister(offset));
        }
        let _ = self.regs.insert(offset, reg);
        Ok(())
    }

    /// Reads the register at `offset`, applying any read-side effect.
    ///
    /// Unmapped offsets return zero. A `ReadClears` register returns its
    /// value and clears it atomically with the read.
    pub fn read(&mut self, offset: u64) -> u32 {
        match self.regs.get_mut(&offset) {
            Some(reg) => {
                let value = reg.value;
                if reg.effect == RegEffect::ReadClears {
                    reg.value = 0;
                }
                value
            }
            None => 0,
        }
    }

    /// Reads the register at `offset` without triggering read-side effects.
    ///
    /// Device update logic and tests use this to observe state.
    pub fn peek(&self, offset: u64) -> u32 {
        self.regs.get(&offset).map_or(0, |reg| reg.value)
    }

    /// Reads a 64-bit quantity stored as two adjacent word cells, without
    /// side effects.
    pub fn peek64(&self, offset: u64) -> u64 {
        u64::from(self.peek(offset)) | (u64::from(self.peek(offset + 4)) << 32)
    }

    /// Overwrites the register value directly, bypassing the write behavior.
    ///
    /// This is the device-internal update path (for example hardware setting
    /// a pending bit); it is a no-op for unmapped offsets.
    pub fn poke(&mut self, offset: u64, value: u32) {
        if let Some(reg) = self.regs.get_mut(&offset) {
            reg.value = value & reg.width_mask;
        }
    }

    /// Writes `value` to the register at `offset` under a 4-lane byte mask.
    ///
    /// For each selected lane the new byte is combined with the prior byte
    /// per the register's [`RegEffect`]; unselected lanes keep their prior
    /// value. Unmapped offsets are a silent no-op.
    pub fn write(&mut self, offset: u64, value: u32, lane_mask: u8) {
        let Some(reg) = self.regs.get_mut(&offset) else {
            return;
        };
        let mut out = reg.value;
        for lane in 0..4 {
            if (lane_mask >> lane) & 1 == 0 {
                continue;
            }
            let shift = lane * 8;
            let old = (out >> shift) as u8;
            let new = (value >> shift) as u8;
            let merged = u32::from(reg.effect.apply(old, new));
            out = (out & !(0xFF << shift)) | (merged << shift);
        }
        reg.value = out & reg.width_mask;
    }

    /// Returns the offsets currently mapped, in ascending order.
    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.regs.keys().copied()
    }
}
