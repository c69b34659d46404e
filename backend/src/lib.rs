pub mod code_buffer;
pub mod fault;
pub mod location;
pub mod regcache;
pub mod x86_64;

pub use code_buffer::CodeBuffer;
pub use fault::{CacheFault, Inconsistency};
pub use location::{Location, MemSlot};
pub use regcache::{GprCache, GprCacheState, GuestRegSlot, HostRegSlot, RegCacheOptions};
pub use x86_64::{Reg, X86_64CodeGen};

/// Trait for host architecture code generators.
///
/// The register cache only ever emits 32-bit moves between a host
/// register, an immediate and a guest-context slot; those are the
/// primitives below. Translators emit everything else directly.
pub trait HostCodeGen {
    /// Emit the block entry: save callee-saved registers and load
    /// the context and memory-base registers from the arguments.
    fn emit_prologue(&mut self, buf: &mut CodeBuffer);

    /// Emit the block exit: restore callee-saved registers, return.
    fn emit_epilogue(&mut self, buf: &mut CodeBuffer);

    // -- Register cache primitives --

    /// Emit host mov between two registers.
    fn out_mov(&self, buf: &mut CodeBuffer, dst: Reg, src: Reg);

    /// Emit host load-immediate into a register.
    ///
    /// Must not touch the flags.
    fn out_movi(&self, buf: &mut CodeBuffer, dst: Reg, val: u32);

    /// Emit host load from memory [base + offset] into register.
    fn out_ld(&self, buf: &mut CodeBuffer, dst: Reg, base: Reg, offset: i32);

    /// Emit host store from register to memory [base + offset].
    fn out_st(&self, buf: &mut CodeBuffer, src: Reg, base: Reg, offset: i32);

    /// Emit host store of an immediate to memory [base + offset].
    fn out_sti(&self, buf: &mut CodeBuffer, base: Reg, offset: i32, val: u32);

    /// Emit a move between two locations.
    ///
    /// Immediates are never a destination and memory-to-memory
    /// moves do not exist on the host; both are caller bugs.
    fn out_mov_loc(&self, buf: &mut CodeBuffer, dst: Location, src: Location) {
        match (dst, src) {
            (Location::Reg(d), Location::Reg(s)) => self.out_mov(buf, d, s),
            (Location::Reg(d), Location::Imm(v)) => self.out_movi(buf, d, v),
            (Location::Reg(d), Location::Mem(m)) => self.out_ld(buf, d, m.base, m.disp),
            (Location::Mem(m), Location::Reg(s)) => self.out_st(buf, s, m.base, m.disp),
            (Location::Mem(m), Location::Imm(v)) => self.out_sti(buf, m.base, m.disp, v),
            (Location::Mem(_), Location::Mem(_)) | (Location::Imm(_), _) => {
                panic!("unencodable move {src:?} -> {dst:?}")
            }
        }
    }
}
