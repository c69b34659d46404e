use core::mem::offset_of;

use crate::guest::GuestReg;

/// Bias applied to the context register.
///
/// Generated code holds `&state.r[0] + CTX_BIAS` in the context
/// register, so the whole register block sits in
/// `[-128, 127]` and every slot encodes with a disp8.
pub const CTX_BIAS: i32 = 128;

/// Guest CPU context as seen by generated code.
///
/// Only the leading register block is addressed by the register
/// cache; its layout is fixed. Fields after it belong to the
/// translator and interpreter.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct MipsState {
    pub r: [u32; 32],
    pub hi: u32,
    pub lo: u32,
    pub fpcond: u32,
    pub vfpu_cc: u32,
    pub pc: u32,
    pub downcount: i32,
}

impl MipsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer to hand to generated code as the context register.
    pub fn ctx_ptr(&mut self) -> *mut u8 {
        // SAFETY: CTX_BIAS stays inside the repr(C) struct.
        unsafe { (self as *mut Self as *mut u8).add(CTX_BIAS as usize) }
    }

    /// Read a guest register by cache index.
    pub fn reg(&self, reg: GuestReg) -> u32 {
        match reg {
            GuestReg::HI => self.hi,
            GuestReg::LO => self.lo,
            GuestReg::FPCOND => self.fpcond,
            GuestReg::VFPUCC => self.vfpu_cc,
            r => self.r[r.index()],
        }
    }

    pub fn set_reg(&mut self, reg: GuestReg, val: u32) {
        match reg {
            GuestReg::HI => self.hi = val,
            GuestReg::LO => self.lo = val,
            GuestReg::FPCOND => self.fpcond = val,
            GuestReg::VFPUCC => self.vfpu_cc = val,
            r => self.r[r.index()] = val,
        }
    }
}

/// Displacement of a guest register's backing slot from the
/// (biased) context register.
pub fn context_offset(reg: GuestReg) -> i32 {
    let field = match reg {
        GuestReg::HI => offset_of!(MipsState, hi),
        GuestReg::LO => offset_of!(MipsState, lo),
        GuestReg::FPCOND => offset_of!(MipsState, fpcond),
        GuestReg::VFPUCC => offset_of!(MipsState, vfpu_cc),
        r => {
            assert!(r.is_gpr(), "bad guest register {}", r.0);
            offset_of!(MipsState, r) + r.index() * 4
        }
    };
    field as i32 - CTX_BIAS
}
