use std::fmt;

use mipsjit_core::RegSet;

/// Number of x86-64 general-purpose registers; size of the host
/// register table.
pub const NUM_X_REGS: usize = 16;

/// x86-64 general-purpose register indices.
///
/// Encoding matches the x86-64 ModR/M and REX register numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    pub const ALL: [Reg; NUM_X_REGS] = [
        Reg::Rax,
        Reg::Rcx,
        Reg::Rdx,
        Reg::Rbx,
        Reg::Rsp,
        Reg::Rbp,
        Reg::Rsi,
        Reg::Rdi,
        Reg::R8,
        Reg::R9,
        Reg::R10,
        Reg::R11,
        Reg::R12,
        Reg::R13,
        Reg::R14,
        Reg::R15,
    ];

    /// Low 3 bits of the register encoding (for ModR/M).
    #[inline]
    pub const fn low3(self) -> u8 {
        (self as u8) & 0x7
    }

    pub const fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::Rbx => "rbx",
            Reg::Rsp => "rsp",
            Reg::Rbp => "rbp",
            Reg::Rsi => "rsi",
            Reg::Rdi => "rdi",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
            Reg::R10 => "r10",
            Reg::R11 => "r11",
            Reg::R12 => "r12",
            Reg::R13 => "r13",
            Reg::R14 => "r14",
            Reg::R15 => "r15",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Points at the guest context, biased by `CTX_BIAS`.
pub const CTX_REG: Reg = Reg::R14;

/// Base of guest memory.
pub const MEMBASE_REG: Reg = Reg::R15;

/// Order in which the GPR cache hands out host registers.
///
/// RCX and RDX carry the first helper-call arguments and are never
/// cached. R12 as a base register forces a SIB byte in every
/// addressing form, so it goes last.
#[cfg(windows)]
pub const ALLOCATION_ORDER: &[Reg] = &[
    Reg::Rsi,
    Reg::Rdi,
    Reg::R13,
    Reg::R8,
    Reg::R9,
    Reg::R10,
    Reg::R11,
    Reg::R12,
];

/// Order in which the GPR cache hands out host registers.
///
/// RCX and RDX carry helper-call arguments, RSI/RDI the first two
/// on System V; none of them are cached. R12 as a base register
/// forces a SIB byte in every addressing form, so it goes last.
#[cfg(not(windows))]
pub const ALLOCATION_ORDER: &[Reg] = &[
    Reg::Rbp,
    Reg::R13,
    Reg::R8,
    Reg::R9,
    Reg::R10,
    Reg::R11,
    Reg::R12,
];

/// Callee-saved registers that the prologue must save/restore.
#[cfg(windows)]
pub const CALLEE_SAVED: &[Reg] = &[
    Reg::Rbx,
    Reg::Rbp,
    Reg::Rsi,
    Reg::Rdi,
    Reg::R12,
    Reg::R13,
    Reg::R14,
    Reg::R15,
];

/// Callee-saved registers that the prologue must save/restore
/// (System V ABI).
#[cfg(not(windows))]
pub const CALLEE_SAVED: &[Reg] = &[Reg::Rbx, Reg::Rbp, Reg::R12, Reg::R13, Reg::R14, Reg::R15];

/// Function argument registers.
#[cfg(windows)]
pub const CALL_ARG_REGS: &[Reg] = &[Reg::Rcx, Reg::Rdx, Reg::R8, Reg::R9];

/// Function argument registers (System V AMD64 ABI).
#[cfg(not(windows))]
pub const CALL_ARG_REGS: &[Reg] = &[Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];

/// Registers never handed to the GPR cache.
pub const RESERVED_REGS: RegSet = RegSet::from_raw(
    (1 << Reg::Rsp as u64) | (1 << CTX_REG as u64) | (1 << MEMBASE_REG as u64),
);

pub const STACK_ALIGN: usize = 16;

/// Total push size: return address (implicit) + callee-saved pushes.
pub const PUSH_SIZE: usize = (1 + CALLEE_SAVED.len()) * 8;

/// Stack adjustment after pushes, keeping RSP 16-byte aligned for
/// helper calls.
pub const STACK_ADDEND: usize = ((PUSH_SIZE + STACK_ALIGN - 1) & !(STACK_ALIGN - 1)) - PUSH_SIZE;
