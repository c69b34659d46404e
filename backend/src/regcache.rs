//! MIPS GPR → x86-64 register cache.
//!
//! A local, greedy, single-pass cache. The translator asks for guest
//! registers operand by operand; the cache binds them to host
//! registers, tracks translation-time constants, and spills back to
//! the guest context when it runs out of registers or at a flush.
//!
//! Two fixed tables hold all state: one slot per guest register and
//! one per host register. Locks on either side are
//! code-generation scoped and protect registers across the several
//! host instructions emitted for one guest instruction.

use mipsjit_core::{context_offset, GuestReg, NoUsage, UsageOracle, NUM_GUEST_REGS};

use crate::code_buffer::CodeBuffer;
use crate::fault::{fatal, CacheFault, Inconsistency};
use crate::location::{Location, MemSlot};
use crate::x86_64::regs::{ALLOCATION_ORDER, CTX_REG, NUM_X_REGS};
use crate::x86_64::Reg;
use crate::HostCodeGen;

/// Lookahead window, in guest instructions, used to avoid spilling
/// a register that is about to be read again.
pub const UNUSED_LOOKAHEAD_OPS: usize = 30;

/// Most registers a single `lock`/`lock_x` call accepts.
pub const MAX_LOCKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegCacheOptions {
    /// Window passed to the usage oracle when picking a spill victim.
    pub spill_lookahead: usize,
}

impl Default for RegCacheOptions {
    fn default() -> Self {
        Self {
            spill_lookahead: UNUSED_LOOKAHEAD_OPS,
        }
    }
}

/// Where one guest register lives.
///
/// `away` is set whenever `location` is not the default slot, i.e.
/// the value is an immediate or sits in a host register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestRegSlot {
    pub location: Location,
    pub away: bool,
    pub locked: bool,
}

/// Occupancy of one host register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRegSlot {
    pub free: bool,
    pub dirty: bool,
    pub owner: Option<GuestReg>,
    /// Reserved by the translator as scratch; never handed out.
    pub alloc_locked: bool,
}

impl HostRegSlot {
    const FREE: HostRegSlot = HostRegSlot {
        free: true,
        dirty: false,
        owner: None,
        alloc_locked: false,
    };
}

/// Verbatim copy of both tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GprCacheState {
    regs: [GuestRegSlot; NUM_GUEST_REGS],
    xregs: [HostRegSlot; NUM_X_REGS],
}

/// Canonical backing slot of a guest register.
pub fn default_location(reg: GuestReg) -> MemSlot {
    MemSlot {
        base: CTX_REG,
        disp: context_offset(reg),
    }
}

fn default_regs() -> [GuestRegSlot; NUM_GUEST_REGS] {
    std::array::from_fn(|i| GuestRegSlot {
        location: Location::Mem(default_location(GuestReg::from_index(i))),
        away: false,
        locked: false,
    })
}

/// GPR register cache for one translator.
pub struct GprCache<B: HostCodeGen> {
    backend: B,
    regs: [GuestRegSlot; NUM_GUEST_REGS],
    xregs: [HostRegSlot; NUM_X_REGS],
    oracle: Box<dyn UsageOracle>,
    compiler_pc: u32,
    options: RegCacheOptions,
}

impl<B: HostCodeGen> GprCache<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, RegCacheOptions::default())
    }

    pub fn with_options(backend: B, options: RegCacheOptions) -> Self {
        let mut cache = Self {
            backend,
            regs: default_regs(),
            xregs: [HostRegSlot::FREE; NUM_X_REGS],
            oracle: Box::new(NoUsage),
            compiler_pc: 0,
            options,
        };
        cache.set_imm(GuestReg::ZERO, 0);
        cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn options(&self) -> RegCacheOptions {
        self.options
    }

    /// Reset both tables for a new block starting at `start_pc`.
    pub fn start(&mut self, oracle: Box<dyn UsageOracle>, start_pc: u32) {
        log::debug!("regcache: start block at {start_pc:#010x}");
        self.xregs = [HostRegSlot::FREE; NUM_X_REGS];
        self.regs = default_regs();
        self.set_imm(GuestReg::ZERO, 0);
        self.oracle = oracle;
        self.compiler_pc = start_pc;
    }

    /// Guest address of the instruction being translated; the spill
    /// lookahead scans forward from here.
    pub fn set_compiler_pc(&mut self, pc: u32) {
        self.compiler_pc = pc;
    }

    pub fn compiler_pc(&self) -> u32 {
        self.compiler_pc
    }

    pub fn allocation_order(&self) -> &'static [Reg] {
        ALLOCATION_ORDER
    }

    // -- Queries --

    pub fn slot(&self, reg: GuestReg) -> &GuestRegSlot {
        &self.regs[reg.index()]
    }

    pub fn xreg(&self, xr: Reg) -> &HostRegSlot {
        &self.xregs[xr as usize]
    }

    /// Current location of a guest register, usable as an operand.
    pub fn r(&self, reg: GuestReg) -> Location {
        self.regs[reg.index()].location
    }

    /// Host register holding `reg`. The register must be mapped.
    pub fn rx(&self, reg: GuestReg) -> Reg {
        let slot = &self.regs[reg.index()];
        match slot.location {
            Location::Reg(xr) if slot.away => xr,
            _ => fatal(CacheFault::NotMapped(reg)),
        }
    }

    pub fn is_bound(&self, reg: GuestReg) -> bool {
        self.regs[reg.index()].away
    }

    pub fn is_mapped(&self, reg: GuestReg) -> bool {
        let slot = &self.regs[reg.index()];
        slot.away && slot.location.is_simple_reg()
    }

    pub fn is_locked(&self, reg: GuestReg) -> bool {
        self.regs[reg.index()].locked
    }

    pub fn is_x_locked(&self, xr: Reg) -> bool {
        self.xregs[xr as usize].alloc_locked
    }

    pub fn is_x_free(&self, xr: Reg) -> bool {
        self.xregs[xr as usize].free
    }

    pub fn is_x_dirty(&self, xr: Reg) -> bool {
        self.xregs[xr as usize].dirty
    }

    pub fn owner_of(&self, xr: Reg) -> Option<GuestReg> {
        self.xregs[xr as usize].owner
    }

    // -- Immediates --

    /// Bind `reg` to a known constant, dropping any host binding
    /// without writing it back.
    pub fn set_imm(&mut self, reg: GuestReg, value: u32) {
        let value = if reg.is_zero() { 0 } else { value };
        self.discard_reg_contents_if_cached(reg);
        let slot = &mut self.regs[reg.index()];
        slot.away = true;
        slot.location = Location::Imm(value);
    }

    pub fn is_imm(&self, reg: GuestReg) -> bool {
        self.regs[reg.index()].location.is_imm()
    }

    /// Constant value of `reg`. Only valid when `is_imm(reg)`.
    pub fn get_imm(&self, reg: GuestReg) -> u32 {
        debug_assert!(self.is_imm(reg), "{reg} must be an immediate");
        if reg.is_zero() {
            return 0;
        }
        self.regs[reg.index()].location.imm_value().unwrap_or_default()
    }

    /// Forget a host binding without storing it.
    pub fn discard_reg_contents_if_cached(&mut self, reg: GuestReg) {
        let slot = self.regs[reg.index()];
        if let (true, Location::Reg(xr)) = (slot.away, slot.location) {
            self.xregs[xr as usize] = HostRegSlot {
                alloc_locked: self.xregs[xr as usize].alloc_locked,
                ..HostRegSlot::FREE
            };
            let slot = &mut self.regs[reg.index()];
            slot.away = false;
            slot.location = Location::Mem(default_location(reg));
        }
    }

    /// Move an immediate into a host register so it can be used as
    /// an operand that must be a register. Already-mapped registers
    /// only pick up `make_dirty`.
    pub fn kill_immediate(
        &mut self,
        buf: &mut CodeBuffer,
        reg: GuestReg,
        do_load: bool,
        make_dirty: bool,
    ) {
        let slot = self.regs[reg.index()];
        if !slot.away {
            return;
        }
        match slot.location {
            Location::Imm(_) => self.map_reg(buf, reg, do_load, make_dirty),
            Location::Reg(xr) => self.xregs[xr as usize].dirty |= make_dirty,
            Location::Mem(_) => {}
        }
    }

    // -- Locking --

    /// Protect guest registers from being spilled until `unlock_all`.
    pub fn lock(&mut self, regs: &[GuestReg]) {
        if regs.len() > MAX_LOCKS {
            fatal(CacheFault::TooManyLocks(regs.len()));
        }
        for &reg in regs {
            self.regs[reg.index()].locked = true;
        }
    }

    /// Reserve host registers as scratch until `unlock_all_x`.
    pub fn lock_x(&mut self, xregs: &[Reg]) {
        if xregs.len() > MAX_LOCKS {
            fatal(CacheFault::TooManyLocks(xregs.len()));
        }
        for &xr in xregs {
            let x = &mut self.xregs[xr as usize];
            if x.alloc_locked {
                fatal(CacheFault::HostRegAlreadyLocked(xr));
            }
            x.alloc_locked = true;
        }
    }

    pub fn unlock_all(&mut self) {
        for slot in self.regs.iter_mut() {
            slot.locked = false;
        }
        // ZERO may have been mapped for an operand; it is an immediate again.
        self.set_imm(GuestReg::ZERO, 0);
    }

    pub fn unlock_all_x(&mut self) {
        for x in self.xregs.iter_mut() {
            x.alloc_locked = false;
        }
    }

    // -- Allocation --

    /// Pick a host register to evict, in allocation order.
    ///
    /// With `unused_only`, skip registers whose guest value is read
    /// again within the lookahead window.
    pub fn find_best_to_spill(&self, unused_only: bool) -> Option<Reg> {
        for &xr in ALLOCATION_ORDER {
            let x = &self.xregs[xr as usize];
            if x.alloc_locked {
                continue;
            }
            if let Some(owner) = x.owner {
                if self.regs[owner.index()].locked {
                    continue;
                }
                if unused_only
                    && self.oracle.is_register_used(
                        owner,
                        self.compiler_pc,
                        self.options.spill_lookahead,
                    )
                {
                    continue;
                }
            }
            return Some(xr);
        }
        None
    }

    /// Return a free, unlocked host register, spilling if needed.
    pub fn get_free_xreg(&mut self, buf: &mut CodeBuffer) -> Reg {
        for &xr in ALLOCATION_ORDER {
            let x = &self.xregs[xr as usize];
            if !x.alloc_locked && x.free {
                return xr;
            }
        }

        let best = self
            .find_best_to_spill(true)
            .or_else(|| self.find_best_to_spill(false));
        match best {
            Some(xr) => {
                if let Some(owner) = self.xregs[xr as usize].owner {
                    log::trace!("regcache: spill {owner} from {xr}");
                    self.store_from_register(buf, owner);
                }
                xr
            }
            None => fatal(CacheFault::OutOfRegisters),
        }
    }

    /// Bind `reg` to a host register.
    ///
    /// With `do_load` the current value (constant or memory) is
    /// loaded; otherwise the caller is about to overwrite it.
    /// `make_dirty` marks the host copy as newer than memory.
    pub fn map_reg(&mut self, buf: &mut CodeBuffer, reg: GuestReg, do_load: bool, make_dirty: bool) {
        let slot = self.regs[reg.index()];
        match (slot.away, slot.location) {
            (true, Location::Reg(xr)) => {
                self.xregs[xr as usize].dirty |= make_dirty;
            }
            (false, Location::Imm(_)) => fatal(CacheFault::BadImmediate(reg)),
            (true, Location::Mem(_)) | (false, Location::Reg(_)) => {
                fatal(CacheFault::CorruptSlot(reg))
            }
            (true, Location::Imm(_)) | (false, Location::Mem(_)) => {
                let xr = self.get_free_xreg(buf);
                let x = self.xregs[xr as usize];
                if x.dirty {
                    fatal(CacheFault::HostRegAlreadyDirty(xr));
                }
                if x.alloc_locked {
                    fatal(CacheFault::BoundToLockedHostReg(xr));
                }
                self.xregs[xr as usize] = HostRegSlot {
                    free: false,
                    dirty: make_dirty || slot.location.is_imm(),
                    owner: Some(reg),
                    alloc_locked: false,
                };

                if do_load {
                    let src = if reg.is_zero() {
                        Location::Imm(0)
                    } else {
                        slot.location
                    };
                    log::trace!("regcache: load {reg} into {xr} from {src:?}");
                    self.backend.out_mov_loc(buf, Location::Reg(xr), src);
                }

                if let Some(intruder) = GuestReg::all()
                    .find(|&other| other != reg && self.regs[other.index()].location.is_reg(xr))
                {
                    fatal(CacheFault::AliasedHostReg {
                        reg: xr,
                        owner: reg,
                        intruder,
                    });
                }

                let slot = &mut self.regs[reg.index()];
                slot.away = true;
                slot.location = Location::Reg(xr);
            }
        }

        let xr = self.rx(reg);
        if self.xregs[xr as usize].alloc_locked {
            fatal(CacheFault::BoundToLockedHostReg(xr));
        }
    }

    /// Write `reg` back to its slot if needed and unbind it.
    pub fn store_from_register(&mut self, buf: &mut CodeBuffer, reg: GuestReg) {
        let slot = self.regs[reg.index()];
        if !slot.away {
            return;
        }
        let do_store = match slot.location {
            Location::Reg(xr) => {
                let x = &mut self.xregs[xr as usize];
                let dirty = x.dirty;
                x.free = true;
                x.owner = None;
                x.dirty = false;
                dirty
            }
            // Memory never reflects a pending immediate.
            Location::Imm(_) => true,
            Location::Mem(_) => false,
        };

        let new_loc = Location::Mem(default_location(reg));
        if do_store && !reg.is_zero() {
            log::trace!("regcache: store {reg} from {:?}", slot.location);
            self.backend.out_mov_loc(buf, new_loc, slot.location);
        }
        let slot = &mut self.regs[reg.index()];
        slot.location = new_loc;
        slot.away = false;
    }

    /// Spill whatever guest register lives in host register `xr`.
    pub fn flush_r(&mut self, buf: &mut CodeBuffer, xr: Reg) {
        let x = self.xregs[xr as usize];
        if x.free {
            return;
        }
        if let Some(owner) = x.owner {
            self.store_from_register(buf, owner);
        }
    }

    /// Write back and unbind every guest register.
    ///
    /// Nothing may be locked: a leftover lock means the translator
    /// skipped an unlock before a control-flow boundary.
    pub fn flush(&mut self, buf: &mut CodeBuffer) {
        if let Some(&xr) = Reg::ALL.iter().find(|&&xr| self.xregs[xr as usize].alloc_locked) {
            fatal(CacheFault::HostRegLeftLocked(xr));
        }
        if let Some(reg) = GuestReg::all().find(|&reg| self.regs[reg.index()].locked) {
            fatal(CacheFault::GuestRegLeftLocked(reg));
        }
        log::debug!("regcache: flush at {:#010x}", self.compiler_pc);

        self.set_imm(GuestReg::ZERO, 0);
        for reg in GuestReg::all().skip(1) {
            let slot = self.regs[reg.index()];
            if !slot.away {
                continue;
            }
            match slot.location {
                Location::Reg(xr) => {
                    self.store_from_register(buf, reg);
                    self.xregs[xr as usize].dirty = false;
                }
                Location::Imm(_) => self.store_from_register(buf, reg),
                Location::Mem(_) => fatal(CacheFault::CorruptSlot(reg)),
            }
        }
    }

    /// Flush before calling out of generated code.
    pub fn flush_before_call(&mut self, buf: &mut CodeBuffer) {
        // TODO: only the caller-saved host registers need flushing here.
        self.flush(buf);
    }

    // -- Consistency --

    /// Check the cross-table invariants without changing anything.
    pub fn sanity_check(&self) -> Result<(), Inconsistency> {
        for reg in GuestReg::all() {
            let slot = &self.regs[reg.index()];
            match (slot.away, slot.location) {
                (true, Location::Reg(host)) => {
                    let x = &self.xregs[host as usize];
                    if x.alloc_locked {
                        return Err(Inconsistency::LockedHostReg { guest: reg, host });
                    }
                    if x.owner != Some(reg) || x.free {
                        return Err(Inconsistency::OwnerMismatch {
                            guest: reg,
                            host,
                            owner: x.owner,
                        });
                    }
                }
                (false, Location::Imm(_)) => return Err(Inconsistency::UnboundImmediate(reg)),
                _ => {}
            }
        }
        for xr in Reg::ALL {
            let x = &self.xregs[xr as usize];
            if x.free && (x.owner.is_some() || x.dirty) {
                return Err(Inconsistency::StaleHostReg(xr));
            }
        }
        Ok(())
    }

    // -- Snapshot --

    pub fn get_state(&self) -> GprCacheState {
        GprCacheState {
            regs: self.regs,
            xregs: self.xregs,
        }
    }

    /// Restore a snapshot verbatim. No validation: the snapshot must
    /// come from a valid state of this cache.
    pub fn restore_state(&mut self, state: &GprCacheState) {
        self.regs = state.regs;
        self.xregs = state.xregs;
    }
}
