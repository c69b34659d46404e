use crate::x86_64::Reg;

/// A guest-context memory slot: `[base + disp]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemSlot {
    pub base: Reg,
    pub disp: i32,
}

/// Where a guest register's value currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Known at translation time; not materialized anywhere.
    Imm(u32),
    /// Cached in a host register.
    Reg(Reg),
    /// In its backing slot in the guest context.
    Mem(MemSlot),
}

impl Location {
    #[inline]
    pub const fn is_imm(self) -> bool {
        matches!(self, Location::Imm(_))
    }

    #[inline]
    pub const fn is_simple_reg(self) -> bool {
        matches!(self, Location::Reg(_))
    }

    /// True if this is exactly host register `reg`.
    #[inline]
    pub fn is_reg(self, reg: Reg) -> bool {
        self == Location::Reg(reg)
    }

    pub const fn imm_value(self) -> Option<u32> {
        match self {
            Location::Imm(v) => Some(v),
            Location::Reg(_) | Location::Mem(_) => None,
        }
    }
}
