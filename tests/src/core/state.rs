use mipsjit_core::guest::GuestReg;
use mipsjit_core::state::{context_offset, MipsState, CTX_BIAS};

#[test]
fn gpr_slots_are_biased_words() {
    assert_eq!(context_offset(GuestReg::ZERO), -CTX_BIAS);
    assert_eq!(context_offset(GuestReg::A0), -128 + 4 * 4);
    assert_eq!(context_offset(GuestReg::RA), -128 + 31 * 4);
}

#[test]
fn special_slots_follow_gprs() {
    assert_eq!(context_offset(GuestReg::HI), 0);
    assert_eq!(context_offset(GuestReg::LO), 4);
    assert_eq!(context_offset(GuestReg::FPCOND), 8);
    assert_eq!(context_offset(GuestReg::VFPUCC), 12);
}

#[test]
fn every_slot_fits_disp8() {
    for reg in GuestReg::all() {
        let off = context_offset(reg);
        assert!((-128..=127).contains(&off), "{reg} at {off}");
    }
}

#[test]
fn slots_are_distinct() {
    let mut offs: Vec<i32> = GuestReg::all().map(context_offset).collect();
    offs.sort_unstable();
    offs.dedup();
    assert_eq!(offs.len(), GuestReg::all().count());
}

#[test]
fn ctx_ptr_addresses_slots() {
    let mut state = MipsState::new();
    state.set_reg(GuestReg::A0, 0x1234_5678);
    state.set_reg(GuestReg::LO, 77);
    let ctx = state.ctx_ptr();
    // SAFETY: offsets stay within the register block.
    let (a0, lo) = unsafe {
        (
            (ctx.offset(context_offset(GuestReg::A0) as isize) as *const u32).read_unaligned(),
            (ctx.offset(context_offset(GuestReg::LO) as isize) as *const u32).read_unaligned(),
        )
    };
    assert_eq!(a0, 0x1234_5678);
    assert_eq!(lo, 77);
    assert_eq!(state.reg(GuestReg::LO), 77);
    assert_eq!(state.lo, 77);
}
