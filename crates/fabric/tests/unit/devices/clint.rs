//! Timer controller unit tests.
//!
//! Verifies divider-based MTIME advance, 16-bit FREQ/INC masking, compare
//! semantics, the one-cycle output registration of both interrupt lines,
//! per-hart register offsets, and the idle fast-forward hook.

use rstest::rstest;
use rvfabric_core::config::TimerConfig;
use rvfabric_core::devices::MachineTimer;

const MSIP: u64 = 0x0000;
const MTIMECMP: u64 = 0x4000;
const FREQ: u64 = 0x8000;
const INC: u64 = 0x8008;
const MTIME: u64 = 0xBFF8;

fn cfg(freq: u16, inc: u16) -> TimerConfig {
    TimerConfig {
        freq_reset: freq,
        inc_reset: inc,
        ..TimerConfig::default()
    }
}

fn timer(freq: u16, inc: u16) -> MachineTimer {
    MachineTimer::new(1, &cfg(freq, inc)).unwrap()
}

fn set_mtimecmp(t: &mut MachineTimer, hart: u64, value: u64) {
    t.write_word(MTIMECMP + 8 * hart, value as u32, 0xF);
    t.write_word(MTIMECMP + 8 * hart + 4, (value >> 32) as u32, 0xF);
}

#[rstest]
#[case(1, 1, 10, 10)]
#[case(10, 1, 50, 5)]
#[case(10, 3, 50, 15)]
#[case(0, 1, 7, 7)] // zero period advances every clock
fn divider_controls_mtime_rate(
    #[case] freq: u16,
    #[case] inc: u16,
    #[case] ticks: u32,
    #[case] expected: u64,
) {
    let mut t = timer(freq, inc);
    for _ in 0..ticks {
        t.tick();
    }
    assert_eq!(t.mtime(), expected);
}

#[test]
fn mtimecmp_resets_to_max_and_never_fires() {
    let mut t = timer(1, 1);
    assert_eq!(t.read_word(MTIMECMP), u32::MAX);
    assert_eq!(t.read_word(MTIMECMP + 4), u32::MAX);
    for _ in 0..100 {
        t.tick();
        assert!(!t.timer_irq(0));
    }
}

#[test]
fn timer_line_is_registered_one_cycle() {
    let mut t = timer(10, 1);
    set_mtimecmp(&mut t, 0, 5);
    // MTIME reaches 5 on the 50th tick; the output line follows one tick
    // later.
    for _ in 0..50 {
        t.tick();
    }
    assert_eq!(t.mtime(), 5);
    assert!(!t.timer_irq(0));
    t.tick();
    assert!(t.timer_irq(0));
}

#[test]
fn raising_mtimecmp_deasserts_the_line() {
    let mut t = timer(1, 1);
    set_mtimecmp(&mut t, 0, 1);
    t.tick();
    t.tick();
    assert!(t.timer_irq(0));
    set_mtimecmp(&mut t, 0, u64::MAX);
    t.tick();
    t.tick();
    assert!(!t.timer_irq(0));
}

#[test]
fn software_line_follows_msip_with_one_cycle_delay() {
    let mut t = timer(1, 1);
    t.write_word(MSIP, 1, 0b0001);
    assert_eq!(t.read_word(MSIP), 1);
    t.tick();
    assert!(!t.software_irq(0));
    t.tick();
    assert!(t.software_irq(0));

    t.write_word(MSIP, 0, 0xF);
    t.tick();
    t.tick();
    assert!(!t.software_irq(0));
}

#[test]
fn msip_lane_mask_controls_which_bytes_land() {
    let mut t = timer(1, 1);
    // Only the untouched lanes stay zero; a lane-1 write of a nonzero byte
    // still makes MSIP nonzero.
    t.write_word(MSIP, 0x0000_0100, 0b0010);
    t.tick();
    t.tick();
    assert!(t.software_irq(0));
}

#[test]
fn freq_and_inc_are_sixteen_bit() {
    let mut t = timer(1, 1);
    t.write_word(FREQ, 0x0005_0003, 0xF);
    t.write_word(INC, 0xFFFF_0002, 0xF);
    assert_eq!(t.read_word(FREQ), 0x0003);
    assert_eq!(t.read_word(INC), 0x0002);
    for _ in 0..6 {
        t.tick();
    }
    // Period 3, step 2: two wraps in six clocks.
    assert_eq!(t.mtime(), 4);
}

#[test]
fn mtime_is_readable_and_writable() {
    let mut t = timer(1, 1);
    t.write_word(MTIME, 0x1122_3344, 0xF);
    t.write_word(MTIME + 4, 0x5566_7788, 0xF);
    assert_eq!(t.mtime(), 0x5566_7788_1122_3344);
    assert_eq!(t.read_word(MTIME), 0x1122_3344);
    assert_eq!(t.read_word(MTIME + 4), 0x5566_7788);
}

#[test]
fn per_hart_registers_are_independent() {
    let mut t = MachineTimer::new(2, &cfg(1, 1)).unwrap();
    set_mtimecmp(&mut t, 1, 3);
    t.write_word(MSIP + 4, 1, 0xF);
    for _ in 0..4 {
        t.tick();
    }
    assert!(!t.timer_irq(0));
    assert!(t.timer_irq(1));
    assert!(!t.software_irq(0));
    assert!(t.software_irq(1));
}

#[test]
fn idle_fast_forward_jumps_mtime() {
    let mut t = MachineTimer::new(
        1,
        &TimerConfig {
            freq_reset: 100,
            inc_reset: 1,
            fast_wfi: true,
            wfi_jump: 0x100,
        },
    )
    .unwrap();
    t.set_idle(true);
    t.tick();
    assert_eq!(t.mtime(), 0x100);
    t.set_idle(false);
    t.tick();
    assert_eq!(t.mtime(), 0x100);
}

#[test]
fn fast_wfi_disabled_ignores_idle() {
    let mut t = timer(100, 1);
    t.set_idle(true);
    t.tick();
    assert_eq!(t.mtime(), 0);
}
