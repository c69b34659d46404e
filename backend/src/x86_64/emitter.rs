#![allow(non_upper_case_globals)]

use crate::code_buffer::CodeBuffer;
use crate::x86_64::regs::{Reg, CALLEE_SAVED, CALL_ARG_REGS, CTX_REG, MEMBASE_REG, STACK_ADDEND};
use crate::HostCodeGen;

// -- Prefix flags --

pub const P_REXW: u32 = 0x1000; // REX.W = 1

// -- Opcode constants (OPC_*) --

pub const OPC_ARITH_EvIb: u32 = 0x83;
pub const OPC_ARITH_EvIz: u32 = 0x81;

pub const OPC_MOVL_EvGv: u32 = 0x89;
pub const OPC_MOVL_GvEv: u32 = 0x8B;
pub const OPC_MOVL_EvIz: u32 = 0xC7;
pub const OPC_MOVL_Iv: u32 = 0xB8;

pub const OPC_PUSH_r32: u32 = 0x50;
pub const OPC_POP_r32: u32 = 0x58;
pub const OPC_RET: u32 = 0xC3;

/// Arithmetic sub-opcodes (the /r field of 0x81/0x83).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArithOp {
    Add = 0,
    Or = 1,
    Adc = 2,
    Sbb = 3,
    And = 4,
    Sub = 5,
    Xor = 6,
    Cmp = 7,
}

#[inline]
fn rexw_flag(rexw: bool) -> u32 {
    if rexw {
        P_REXW
    } else {
        0
    }
}

// -- Core encoding functions --

/// Emit opcode with REX prefix. `r` is the reg field, `rm` is the r/m field.
/// Both are raw register numbers (0-15). Pass 0 for unused fields.
pub fn emit_opc(buf: &mut CodeBuffer, opc: u32, r: u8, rm: u8) {
    let mut rex: u8 = 0;
    if opc & P_REXW != 0 {
        rex |= 0x08; // REX.W
    }
    if r >= 8 {
        rex |= 0x04; // REX.R
    }
    if rm >= 8 {
        rex |= 0x01; // REX.B
    }
    if rex != 0 {
        buf.emit_u8(0x40 | rex);
    }
    buf.emit_u8(opc as u8);
}

/// Emit opcode + ModR/M for register-register operation.
pub fn emit_modrm(buf: &mut CodeBuffer, opc: u32, r: Reg, rm: Reg) {
    emit_opc(buf, opc, r as u8, rm as u8);
    buf.emit_u8(0xC0 | (r.low3() << 3) | rm.low3());
}

/// Emit opcode + ModR/M with /r extension (for group opcodes).
pub fn emit_modrm_ext(buf: &mut CodeBuffer, opc: u32, ext: u8, rm: Reg) {
    emit_opc(buf, opc, ext, rm as u8);
    buf.emit_u8(0xC0 | (ext << 3) | rm.low3());
}

/// ModR/M (+ SIB, + displacement) for `[base + offset]` with a raw
/// reg field. RBP/R13 always need a displacement, RSP/R12 a SIB.
fn emit_mem_operand(buf: &mut CodeBuffer, r3: u8, base: Reg, offset: i32) {
    let b3 = base.low3();
    let (modbits, disp): (u8, Option<i32>) = if offset == 0 && b3 != 5 {
        (0x00, None)
    } else if (-128..=127).contains(&offset) {
        (0x40, Some(offset))
    } else {
        (0x80, Some(offset))
    };
    if b3 == 4 {
        buf.emit_u8(modbits | (r3 << 3) | 0x04);
        buf.emit_u8(0x24); // SIB: index=none, base=RSP/R12
    } else {
        buf.emit_u8(modbits | (r3 << 3) | b3);
    }
    match (modbits, disp) {
        (0x40, Some(d)) => buf.emit_u8(d as u8),
        (_, Some(d)) => buf.emit_u32(d as u32),
        (_, None) => {}
    }
}

/// Emit opcode + ModR/M + displacement for memory [base + offset].
pub fn emit_modrm_offset(buf: &mut CodeBuffer, opc: u32, r: Reg, base: Reg, offset: i32) {
    emit_opc(buf, opc, r as u8, base as u8);
    emit_mem_operand(buf, r.low3(), base, offset);
}

/// Emit opcode + ModR/M with /r extension for memory [base + offset].
pub fn emit_modrm_ext_offset(buf: &mut CodeBuffer, opc: u32, ext: u8, base: Reg, offset: i32) {
    emit_opc(buf, opc, ext, base as u8);
    emit_mem_operand(buf, ext, base, offset);
}

// -- Arithmetic --

/// Emit arithmetic reg, imm (auto-selects imm8 vs imm32).
pub fn emit_arith_ri(buf: &mut CodeBuffer, op: ArithOp, rexw: bool, dst: Reg, imm: i32) {
    let w = rexw_flag(rexw);
    if (-128..=127).contains(&imm) {
        emit_modrm_ext(buf, OPC_ARITH_EvIb | w, op as u8, dst);
        buf.emit_u8(imm as u8);
    } else {
        emit_modrm_ext(buf, OPC_ARITH_EvIz | w, op as u8, dst);
        buf.emit_u32(imm as u32);
    }
}

// -- Data movement --

/// Emit MOV reg, reg (32-bit or 64-bit).
pub fn emit_mov_rr(buf: &mut CodeBuffer, rexw: bool, dst: Reg, src: Reg) {
    emit_modrm(buf, OPC_MOVL_EvGv | rexw_flag(rexw), src, dst);
}

/// Emit MOV r32, imm32. Always the B8+r form: the register cache
/// runs between flag producers and consumers, so no XOR for zero.
pub fn emit_mov_ri32(buf: &mut CodeBuffer, reg: Reg, val: u32) {
    emit_opc(buf, OPC_MOVL_Iv + (reg.low3() as u32), 0, reg as u8);
    buf.emit_u32(val);
}

/// Emit MOV reg, [base+offset] (load).
pub fn emit_load(buf: &mut CodeBuffer, rexw: bool, dst: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_MOVL_GvEv | rexw_flag(rexw), dst, base, offset);
}

/// Emit MOV [base+offset], reg (store).
pub fn emit_store(buf: &mut CodeBuffer, rexw: bool, src: Reg, base: Reg, offset: i32) {
    emit_modrm_offset(buf, OPC_MOVL_EvGv | rexw_flag(rexw), src, base, offset);
}

/// Emit MOV dword [base+offset], imm32 (store immediate).
pub fn emit_store_imm(buf: &mut CodeBuffer, base: Reg, offset: i32, imm: u32) {
    emit_modrm_ext_offset(buf, OPC_MOVL_EvIz, 0, base, offset);
    buf.emit_u32(imm);
}

// -- Stack / control --

/// Emit PUSH reg.
pub fn emit_push(buf: &mut CodeBuffer, reg: Reg) {
    emit_opc(buf, OPC_PUSH_r32 + (reg.low3() as u32), 0, reg as u8);
}

/// Emit POP reg.
pub fn emit_pop(buf: &mut CodeBuffer, reg: Reg) {
    emit_opc(buf, OPC_POP_r32 + (reg.low3() as u32), 0, reg as u8);
}

/// Emit RET.
pub fn emit_ret(buf: &mut CodeBuffer) {
    buf.emit_u8(OPC_RET as u8);
}

// ==========================================================
// X86_64CodeGen
// ==========================================================

/// x86-64 backend code generator.
///
/// Generated blocks are entered as
/// `extern "C" fn(ctx: *mut u8, membase: *mut u8)` where `ctx` is
/// the biased context pointer (see `MipsState::ctx_ptr`).
#[derive(Debug, Default)]
pub struct X86_64CodeGen {
    pub prologue_offset: usize,
    pub epilogue_offset: usize,
}

impl X86_64CodeGen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostCodeGen for X86_64CodeGen {
    fn emit_prologue(&mut self, buf: &mut CodeBuffer) {
        self.prologue_offset = buf.offset();
        for &reg in CALLEE_SAVED {
            emit_push(buf, reg);
        }
        emit_arith_ri(buf, ArithOp::Sub, true, Reg::Rsp, STACK_ADDEND as i32);
        emit_mov_rr(buf, true, CTX_REG, CALL_ARG_REGS[0]);
        emit_mov_rr(buf, true, MEMBASE_REG, CALL_ARG_REGS[1]);
    }

    fn emit_epilogue(&mut self, buf: &mut CodeBuffer) {
        self.epilogue_offset = buf.offset();
        emit_arith_ri(buf, ArithOp::Add, true, Reg::Rsp, STACK_ADDEND as i32);
        for &reg in CALLEE_SAVED.iter().rev() {
            emit_pop(buf, reg);
        }
        emit_ret(buf);
    }

    fn out_mov(&self, buf: &mut CodeBuffer, dst: Reg, src: Reg) {
        emit_mov_rr(buf, false, dst, src);
    }

    fn out_movi(&self, buf: &mut CodeBuffer, dst: Reg, val: u32) {
        emit_mov_ri32(buf, dst, val);
    }

    fn out_ld(&self, buf: &mut CodeBuffer, dst: Reg, base: Reg, offset: i32) {
        emit_load(buf, false, dst, base, offset);
    }

    fn out_st(&self, buf: &mut CodeBuffer, src: Reg, base: Reg, offset: i32) {
        emit_store(buf, false, src, base, offset);
    }

    fn out_sti(&self, buf: &mut CodeBuffer, base: Reg, offset: i32, val: u32) {
        emit_store_imm(buf, base, offset, val);
    }
}
