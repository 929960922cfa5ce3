//! Byte-lane write masks.
//!
//! Every write transaction on the fabric carries one mask bit per byte lane
//! of the 64-bit datapath. A write updates only the lanes whose bit is set;
//! unselected lanes keep their prior value. Reads carry a mask as well so a
//! device can tell a 32-bit access from a 64-bit one.

/// One bit per byte lane of the 64-bit datapath (`mask width = data width / 8`).
///
/// Bit `i` selects byte lane `i`, i.e. bits `8i..8i+8` of the data word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteMask(pub u8);

impl ByteMask {
    /// Number of byte lanes on the datapath.
    pub const LANES: usize = 8;

    /// All eight lanes selected (a full 64-bit access).
    pub const ALL: Self = Self(0xFF);

    /// The low four lanes (a 32-bit access to the addressed word).
    pub const WORD: Self = Self(0x0F);

    /// Returns a mask selecting `len` lanes starting at lane `first`.
    ///
    /// Lanes past the datapath width are ignored.
    pub const fn lanes(first: usize, len: usize) -> Self {
        let mut mask = 0u8;
        let mut i = 0;
        while i < len && first + i < Self::LANES {
            mask |= 1 << (first + i);
            i += 1;
        }
        Self(mask)
    }

    /// Returns whether byte lane `lane` is selected.
    pub const fn lane(&self, lane: usize) -> bool {
        lane < Self::LANES && (self.0 >> lane) & 1 != 0
    }

    /// Returns whether no lane is selected.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Splits the mask into the low-word and high-word 4-lane halves.
    ///
    /// Used when a 64-bit transaction is applied to a bank of 32-bit
    /// registers as two word operations.
    pub const fn split_words(&self) -> (u8, u8) {
        (self.0 & 0x0F, (self.0 >> 4) & 0x0F)
    }

    /// Merges `new` into `old` byte-by-byte, taking selected lanes from `new`.
    pub const fn merge64(&self, old: u64, new: u64) -> u64 {
        let mut out = old;
        let mut lane = 0;
        while lane < Self::LANES {
            if (self.0 >> lane) & 1 != 0 {
                let shift = lane * 8;
                out = (out & !(0xFF << shift)) | (new & (0xFF << shift));
            }
            lane += 1;
        }
        out
    }
}
