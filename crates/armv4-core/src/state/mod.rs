//! Architectural CPU state model primitives.

/// Processor modes and their register-bank classes.
pub mod mode;
/// Program status word accessors.
pub mod psr;
/// Banked register file.
pub mod registers;
/// Host-observable run state.
pub mod run_state;

pub use mode::{mode_class, Mode, ModeClass, MODE_CLASS_COUNT};
pub use psr::{
    StatusWord, PSR_C, PSR_F, PSR_FLAGS_MASK, PSR_I, PSR_MODE_MASK, PSR_N, PSR_Q, PSR_T, PSR_V,
    PSR_Z,
};
pub use registers::{RegisterFile, LR, PC, REGISTER_COUNT, SP};
pub use run_state::RunState;
