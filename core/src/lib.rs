pub mod analyst;
pub mod guest;
pub mod state;
pub mod types;

pub use analyst::{BlockUsage, InsnUsage, NoUsage, UsageOracle};
pub use guest::{GuestReg, NUM_GUEST_REGS};
pub use state::{context_offset, MipsState, CTX_BIAS};
pub use types::RegSet;
