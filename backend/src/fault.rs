//! Register cache failure types.
//!
//! Nothing here is a guest-visible fault. A [`CacheFault`] means the
//! translator misused the cache and the code emitted so far is
//! already wrong, so it is reported and the process panics; it is
//! never returned. [`Inconsistency`] is the result of the
//! non-mutating table check used by debug builds and tests.

use mipsjit_core::GuestReg;
use thiserror::Error;

use crate::x86_64::Reg;

/// Unrecoverable misuse of the register cache.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFault {
    #[error("host register {0} already locked")]
    HostRegAlreadyLocked(Reg),

    #[error("guest register bound to alloc-locked host register {0}")]
    BoundToLockedHostReg(Reg),

    #[error("host register {0} still locked at flush")]
    HostRegLeftLocked(Reg),

    #[error("guest register {0} still locked at flush")]
    GuestRegLeftLocked(GuestReg),

    #[error("ran out of host registers")]
    OutOfRegisters,

    #[error("free host register {0} is already dirty")]
    HostRegAlreadyDirty(Reg),

    #[error("host register {reg} owned by {owner} is also bound to {intruder}")]
    AliasedHostReg {
        reg: Reg,
        owner: GuestReg,
        intruder: GuestReg,
    },

    #[error("guest register {0} holds an immediate but is not bound")]
    BadImmediate(GuestReg),

    #[error("guest register {0} has a location inconsistent with its bound flag")]
    CorruptSlot(GuestReg),

    #[error("guest register {0} is not in a host register")]
    NotMapped(GuestReg),

    #[error("at most 4 registers can be locked per call, got {0}")]
    TooManyLocks(usize),
}

/// Violation found by `GprCache::sanity_check`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inconsistency {
    #[error("{guest} is bound to alloc-locked host register {host}")]
    LockedHostReg { guest: GuestReg, host: Reg },

    #[error("{guest} is bound to {host}, which is owned by {owner:?}")]
    OwnerMismatch {
        guest: GuestReg,
        host: Reg,
        owner: Option<GuestReg>,
    },

    #[error("{0} holds an immediate but is not bound")]
    UnboundImmediate(GuestReg),

    #[error("free host register {0} still has an owner or dirty bit")]
    StaleHostReg(Reg),
}

/// Report a fault and abort translation.
#[cold]
#[track_caller]
pub fn fatal(fault: CacheFault) -> ! {
    log::error!("regcache: {fault}");
    panic!("regcache: {fault}");
}
