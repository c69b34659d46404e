//! Blocks built through the register cache, executed on the host.

use mipsjit_backend::code_buffer::CodeBuffer;
use mipsjit_backend::x86_64::emitter::{emit_arith_ri, emit_mov_rr, ArithOp};
use mipsjit_backend::{GprCache, HostCodeGen, X86_64CodeGen};
use mipsjit_core::{BlockUsage, GuestReg, InsnUsage, MipsState, NoUsage, UsageOracle};

const BASE: u32 = 0x0880_0000;

type BlockFn = unsafe extern "C" fn(ctx: *mut u8, membase: *mut u8);

/// Emit prologue, the body built by `build`, a flush and the
/// epilogue, then run it once against `state`.
fn run_block<F>(state: &mut MipsState, oracle: Box<dyn UsageOracle>, build: F)
where
    F: FnOnce(&mut GprCache<X86_64CodeGen>, &mut CodeBuffer),
{
    let mut cache = GprCache::new(X86_64CodeGen::new());
    let mut buf = CodeBuffer::new(4096).unwrap();
    cache.start(oracle, BASE);

    cache.backend_mut().emit_prologue(&mut buf);
    build(&mut cache, &mut buf);
    cache.flush(&mut buf);
    assert_eq!(cache.sanity_check(), Ok(()));
    cache.backend_mut().emit_epilogue(&mut buf);

    buf.set_executable().unwrap();
    // SAFETY: the buffer holds a complete prologue..epilogue sequence.
    let f: BlockFn = unsafe { std::mem::transmute(buf.ptr_at(0)) };
    let mut mem = [0u8; 16];
    // SAFETY: ctx_ptr points into `state`, which outlives the call.
    unsafe { f(state.ctx_ptr(), mem.as_mut_ptr()) };
}

#[test]
fn empty_block_preserves_state() {
    let mut state = MipsState::new();
    state.set_reg(GuestReg::A0, 17);
    state.set_reg(GuestReg::HI, 99);
    run_block(&mut state, Box::new(NoUsage), |_, _| {});
    assert_eq!(state.reg(GuestReg::A0), 17);
    assert_eq!(state.reg(GuestReg::HI), 99);
}

#[test]
fn addiu_in_place() {
    let mut state = MipsState::new();
    state.set_reg(GuestReg::A0, 40);
    run_block(&mut state, Box::new(NoUsage), |cache, buf| {
        // addiu a0, a0, 2
        cache.map_reg(buf, GuestReg::A0, true, true);
        emit_arith_ri(buf, ArithOp::Add, false, cache.rx(GuestReg::A0), 2);
    });
    assert_eq!(state.reg(GuestReg::A0), 42);
}

#[test]
fn immediates_reach_memory() {
    let mut state = MipsState::new();
    state.set_reg(GuestReg::V0, 1);
    state.set_reg(GuestReg::LO, 3);
    run_block(&mut state, Box::new(NoUsage), |cache, _| {
        // lui v0, 0x8000 ; li lo, 0 ; li zero, 5
        cache.set_imm(GuestReg::V0, 0x8000_0000);
        cache.set_imm(GuestReg::LO, 0);
        cache.set_imm(GuestReg::ZERO, 5);
    });
    assert_eq!(state.reg(GuestReg::V0), 0x8000_0000);
    assert_eq!(state.reg(GuestReg::LO), 0);
    assert_eq!(state.reg(GuestReg::ZERO), 0);
}

#[test]
fn move_between_guest_registers() {
    let mut state = MipsState::new();
    state.set_reg(GuestReg::S0, 0xCAFE);
    state.set_reg(GuestReg::S1, 1);
    run_block(&mut state, Box::new(NoUsage), |cache, buf| {
        // move s1, s0
        cache.lock(&[GuestReg::S0, GuestReg::S1]);
        cache.map_reg(buf, GuestReg::S0, true, false);
        cache.map_reg(buf, GuestReg::S1, false, true);
        emit_mov_rr(buf, false, cache.rx(GuestReg::S1), cache.rx(GuestReg::S0));
        cache.unlock_all();
    });
    assert_eq!(state.reg(GuestReg::S0), 0xCAFE);
    assert_eq!(state.reg(GuestReg::S1), 0xCAFE);
}

#[test]
fn register_pressure_spills_correctly() {
    let mut state = MipsState::new();
    let regs: Vec<GuestReg> = (1..32).map(GuestReg::gpr).collect();
    for &reg in &regs {
        state.set_reg(reg, reg.0 as u32 * 100);
    }
    run_block(&mut state, Box::new(NoUsage), |cache, buf| {
        for &reg in &regs {
            // addiu reg, reg, 1
            cache.map_reg(buf, reg, true, true);
            emit_arith_ri(buf, ArithOp::Add, false, cache.rx(reg), 1);
        }
    });
    for &reg in &regs {
        assert_eq!(state.reg(reg), reg.0 as u32 * 100 + 1, "{reg}");
    }
    assert_eq!(state.reg(GuestReg::ZERO), 0);
}

#[test]
fn spill_with_lookahead_keeps_results() {
    let mut state = MipsState::new();
    let regs: Vec<GuestReg> = (8..24).map(GuestReg::gpr).collect();
    let mut usage = BlockUsage::new(BASE);
    for &reg in &regs {
        usage.push(InsnUsage::new().read(reg).write(reg));
    }
    for &reg in &regs {
        state.set_reg(reg, 7);
    }
    run_block(&mut state, Box::new(usage), |cache, buf| {
        for (i, &reg) in regs.iter().enumerate() {
            cache.set_compiler_pc(BASE + 4 * i as u32);
            // addiu reg, reg, i
            cache.map_reg(buf, reg, true, true);
            emit_arith_ri(buf, ArithOp::Add, false, cache.rx(reg), i as i32);
        }
    });
    for (i, &reg) in regs.iter().enumerate() {
        assert_eq!(state.reg(reg), 7 + i as u32, "{reg}");
    }
}

#[test]
fn zero_materialized_for_operand() {
    let mut state = MipsState::new();
    state.set_reg(GuestReg::T0, 55);
    run_block(&mut state, Box::new(NoUsage), |cache, buf| {
        // or t0, zero, zero
        cache.lock(&[GuestReg::ZERO, GuestReg::T0]);
        cache.map_reg(buf, GuestReg::ZERO, true, false);
        cache.map_reg(buf, GuestReg::T0, false, true);
        emit_mov_rr(buf, false, cache.rx(GuestReg::T0), cache.rx(GuestReg::ZERO));
        cache.unlock_all();
    });
    assert_eq!(state.reg(GuestReg::T0), 0);
    assert_eq!(state.reg(GuestReg::ZERO), 0);
}
