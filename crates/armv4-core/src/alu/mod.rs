//! Barrel shifter and adder primitives shared by the execution handlers.

/// Carry-propagating adder.
pub mod adder;
/// Barrel shifter.
pub mod shifter;

pub use adder::{add_with_carry, sub_with_carry, AdderOutput};
pub use shifter::{shift, ShiftMode, ShiftType};
