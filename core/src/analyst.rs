use crate::guest::GuestReg;
use crate::types::RegSet;

/// Answers "is this guest register read again soon?" for spill
/// selection.
///
/// `pc` is the guest address of the instruction currently being
/// translated; `lookahead` is the window in instructions.
pub trait UsageOracle {
    fn is_register_used(&self, reg: GuestReg, pc: u32, lookahead: usize) -> bool;
}

/// Oracle that never reports a future use. Spill selection then
/// degenerates to plain allocation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUsage;

impl UsageOracle for NoUsage {
    fn is_register_used(&self, _reg: GuestReg, _pc: u32, _lookahead: usize) -> bool {
        false
    }
}

/// Guest registers read and written by one instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsnUsage {
    pub reads: RegSet,
    pub writes: RegSet,
    /// Branch or jump; the scan ends after its delay slot.
    pub branch: bool,
}

impl InsnUsage {
    pub const fn new() -> Self {
        Self {
            reads: RegSet::EMPTY,
            writes: RegSet::EMPTY,
            branch: false,
        }
    }

    pub const fn read(mut self, reg: GuestReg) -> Self {
        self.reads = self.reads.set(reg.0);
        self
    }

    pub const fn write(mut self, reg: GuestReg) -> Self {
        self.writes = self.writes.set(reg.0);
        self
    }

    pub const fn branch(mut self) -> Self {
        self.branch = true;
        self
    }
}

/// Per-instruction usage of one guest block, starting at
/// `start_pc`, one entry per 4-byte instruction.
#[derive(Debug, Clone, Default)]
pub struct BlockUsage {
    start_pc: u32,
    insns: Vec<InsnUsage>,
}

impl BlockUsage {
    pub fn new(start_pc: u32) -> Self {
        Self {
            start_pc,
            insns: Vec::new(),
        }
    }

    pub fn push(&mut self, usage: InsnUsage) -> &mut Self {
        self.insns.push(usage);
        self
    }

    pub fn start_pc(&self) -> u32 {
        self.start_pc
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    fn index_of(&self, pc: u32) -> Option<usize> {
        let delta = pc.checked_sub(self.start_pc)?;
        if delta % 4 != 0 {
            return None;
        }
        Some((delta / 4) as usize)
    }
}

impl UsageOracle for BlockUsage {
    fn is_register_used(&self, reg: GuestReg, pc: u32, lookahead: usize) -> bool {
        let Some(start) = self.index_of(pc) else {
            return false;
        };
        let mut end = start.saturating_add(lookahead).min(self.insns.len());
        let mut i = start;
        while i < end {
            let insn = &self.insns[i];
            if insn.reads.contains(reg.0) {
                return true;
            }
            if insn.writes.contains(reg.0) {
                return false;
            }
            if insn.branch {
                // Only the delay slot is left on this path.
                end = end.min(i + 2);
            }
            i += 1;
        }
        false
    }
}
