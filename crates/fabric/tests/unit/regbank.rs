//! Register bank unit tests.
//!
//! Verifies byte-lane masked writes, the closed set of write behaviors,
//! read side effects, width masking, and map-time validation.

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvfabric_core::common::ConfigError;
use rvfabric_core::regbank::{RegEffect, Register, RegisterBank};

fn bank_with(offset: u64, reg: Register) -> RegisterBank {
    let mut bank = RegisterBank::new();
    bank.map(offset, reg).unwrap();
    bank
}

#[test]
fn reset_value_reads_back() {
    let mut bank = bank_with(0x10, Register::new(0xDEAD_BEEF));
    assert_eq!(bank.read(0x10), 0xDEAD_BEEF);
}

#[test]
fn unmapped_offset_reads_zero() {
    let mut bank = bank_with(0x10, Register::new(0xFFFF_FFFF));
    assert_eq!(bank.read(0x20), 0);
}

#[test]
fn unmapped_write_is_dropped() {
    let mut bank = bank_with(0x10, Register::new(5));
    bank.write(0x20, 0xFFFF_FFFF, 0xF);
    bank.poke(0x20, 0xFFFF_FFFF);
    assert_eq!(bank.read(0x20), 0);
    assert_eq!(bank.read(0x10), 5);
}

#[rstest]
#[case(0b0001, 0xAABB_CC44)]
#[case(0b0011, 0xAABB_3344)]
#[case(0b1100, 0x1122_CCDD)]
#[case(0b1111, 0x1122_3344)]
#[case(0b0000, 0xAABB_CCDD)]
fn write_updates_only_selected_lanes(#[case] lane_mask: u8, #[case] expected: u32) {
    let mut bank = bank_with(0, Register::new(0xAABB_CCDD));
    bank.write(0, 0x1122_3344, lane_mask);
    assert_eq!(bank.read(0), expected);
}

#[test]
fn write_one_clears() {
    let mut bank = bank_with(0, Register::with_effect(0xFF, RegEffect::WriteOneClears));
    bank.write(0, 0x0F, 0xF);
    assert_eq!(bank.read(0), 0xF0);
    // Writing zero clears nothing.
    bank.write(0, 0x00, 0xF);
    assert_eq!(bank.read(0), 0xF0);
}

#[test]
fn write_one_sets() {
    let mut bank = bank_with(0, Register::with_effect(0x01, RegEffect::WriteOneSets));
    bank.write(0, 0x10, 0xF);
    assert_eq!(bank.read(0), 0x11);
}

#[test]
fn write_one_clears_respects_lane_mask() {
    let mut bank = bank_with(
        0,
        Register::with_effect(0xFFFF_FFFF, RegEffect::WriteOneClears),
    );
    // Only lane 0 is selected; the set bits in other lanes are ignored.
    bank.write(0, 0xFFFF_FFFF, 0b0001);
    assert_eq!(bank.read(0), 0xFFFF_FF00);
}

#[test]
fn read_clears_returns_then_zeroes() {
    let mut bank = bank_with(0, Register::with_effect(0x55, RegEffect::ReadClears));
    assert_eq!(bank.read(0), 0x55);
    assert_eq!(bank.read(0), 0);
}

#[test]
fn peek_does_not_trigger_read_side_effects() {
    let mut bank = bank_with(0, Register::with_effect(0x55, RegEffect::ReadClears));
    assert_eq!(bank.peek(0), 0x55);
    assert_eq!(bank.peek(0), 0x55);
    assert_eq!(bank.read(0), 0x55);
}

#[test]
fn narrow_register_masks_reset_and_writes() {
    let mut bank = bank_with(0, Register::narrow(0xFFFF_FFFF, 16));
    assert_eq!(bank.read(0), 0xFFFF);
    bank.write(0, 0x0012_3456, 0xF);
    assert_eq!(bank.read(0), 0x3456);
}

#[test]
fn poke_bypasses_write_behavior() {
    let mut bank = bank_with(0, Register::with_effect(0xFF, RegEffect::WriteOneClears));
    bank.poke(0, 0x12);
    assert_eq!(bank.read(0), 0x12);
}

#[test]
fn peek64_combines_adjacent_words() {
    let mut bank = RegisterBank::new();
    bank.map(0x8, Register::new(0x1111_2222)).unwrap();
    bank.map(0xC, Register::new(0x3333_4444)).unwrap();
    assert_eq!(bank.peek64(0x8), 0x3333_4444_1111_2222);
}

#[test]
fn duplicate_offset_is_rejected() {
    let mut bank = bank_with(0x10, Register::new(0));
    let err = bank.map(0x10, Register::new(1)).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateRegister(0x10)));
}

#[test]
fn misaligned_offset_is_rejected() {
    let mut bank = RegisterBank::new();
    let err = bank.map(0x11, Register::new(0)).unwrap_err();
    assert!(matches!(err, ConfigError::MisalignedRegister(0x11)));
}

#[test]
fn offsets_iterate_in_ascending_order() {
    let mut bank = RegisterBank::new();
    bank.map(0x20, Register::new(0)).unwrap();
    bank.map(0x0, Register::new(0)).unwrap();
    bank.map(0x10, Register::new(0)).unwrap();
    let offsets: Vec<u64> = bank.offsets().collect();
    assert_eq!(offsets, vec![0x0, 0x10, 0x20]);
}
