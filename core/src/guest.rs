use std::fmt;

/// Number of guest registers tracked by the register cache:
/// 32 GPRs followed by HI, LO, FPCOND and the VFPU condition code.
pub const NUM_GUEST_REGS: usize = 36;

/// Index of a guest (MIPS) register.
///
/// Indices 0..32 are the architectural GPRs in encoding order,
/// so a decoded `rs`/`rt`/`rd` field maps directly via
/// [`GuestReg::gpr`]. The special registers follow at 32..36.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestReg(pub u8);

impl GuestReg {
    /// Hardwired zero. Reads as 0, writes are discarded.
    pub const ZERO: GuestReg = GuestReg(0);
    pub const AT: GuestReg = GuestReg(1);
    pub const V0: GuestReg = GuestReg(2);
    pub const V1: GuestReg = GuestReg(3);
    pub const A0: GuestReg = GuestReg(4);
    pub const A1: GuestReg = GuestReg(5);
    pub const A2: GuestReg = GuestReg(6);
    pub const A3: GuestReg = GuestReg(7);
    pub const T0: GuestReg = GuestReg(8);
    pub const T1: GuestReg = GuestReg(9);
    pub const T2: GuestReg = GuestReg(10);
    pub const T3: GuestReg = GuestReg(11);
    pub const T4: GuestReg = GuestReg(12);
    pub const T5: GuestReg = GuestReg(13);
    pub const T6: GuestReg = GuestReg(14);
    pub const T7: GuestReg = GuestReg(15);
    pub const S0: GuestReg = GuestReg(16);
    pub const S1: GuestReg = GuestReg(17);
    pub const S2: GuestReg = GuestReg(18);
    pub const S3: GuestReg = GuestReg(19);
    pub const S4: GuestReg = GuestReg(20);
    pub const S5: GuestReg = GuestReg(21);
    pub const S6: GuestReg = GuestReg(22);
    pub const S7: GuestReg = GuestReg(23);
    pub const T8: GuestReg = GuestReg(24);
    pub const T9: GuestReg = GuestReg(25);
    pub const K0: GuestReg = GuestReg(26);
    pub const K1: GuestReg = GuestReg(27);
    pub const GP: GuestReg = GuestReg(28);
    pub const SP: GuestReg = GuestReg(29);
    pub const FP: GuestReg = GuestReg(30);
    pub const RA: GuestReg = GuestReg(31);

    pub const HI: GuestReg = GuestReg(32);
    pub const LO: GuestReg = GuestReg(33);
    pub const FPCOND: GuestReg = GuestReg(34);
    pub const VFPUCC: GuestReg = GuestReg(35);

    /// GPR from a 5-bit instruction field.
    #[inline]
    pub const fn gpr(field: u32) -> Self {
        GuestReg((field & 0x1F) as u8)
    }

    /// Guest register from a table index. Panics on an index past
    /// the special registers.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        assert!(index < NUM_GUEST_REGS, "bad guest register {index}");
        GuestReg(index as u8)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_gpr(self) -> bool {
        self.0 < 32
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// All guest registers in table order.
    pub fn all() -> impl Iterator<Item = GuestReg> {
        (0..NUM_GUEST_REGS as u8).map(GuestReg)
    }

    pub const fn name(self) -> &'static str {
        const NAMES: [&str; NUM_GUEST_REGS] = [
            "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2",
            "t3", "t4", "t5", "t6", "t7", "s0", "s1", "s2", "s3", "s4", "s5",
            "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra", "hi",
            "lo", "fpcond", "vfpucc",
        ];
        NAMES[self.0 as usize]
    }
}

impl fmt::Display for GuestReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for GuestReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestReg({})", self.name())
    }
}
