//! Condition flag update behaviours for the instruction classes.

use crate::alu::AdderOutput;
use crate::state::StatusWord;

/// How an instruction with the S bit set updates N, Z, C and V.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// No change.
    #[default]
    None,
    /// N and Z from the result, C from the shifter, V unchanged.
    Logical {
        /// Operation result.
        result: u32,
        /// Shifter carry out.
        carry: bool,
    },
    /// N, Z, C and V from the adder.
    Arithmetic(AdderOutput),
    /// N and Z only (multiplies).
    NegativeZero(u32),
}

impl FlagsUpdate {
    /// Writes the flags into `psr`.
    pub const fn apply(self, psr: &mut StatusWord) {
        match self {
            Self::None => {}
            Self::Logical { result, carry } => {
                psr.set_nz(result);
                psr.set_carry(carry);
            }
            Self::Arithmetic(out) => {
                psr.set_nz(out.result);
                psr.set_carry(out.carry);
                psr.set_overflow(out.overflow);
            }
            Self::NegativeZero(result) => psr.set_nz(result),
        }
    }
}
