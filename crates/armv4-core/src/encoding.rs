use crate::state::StatusWord;

/// Instruction shapes recognised by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionShape {
    /// Data processing with rotated 8-bit immediate.
    DataProcImm,
    /// Data processing with register shifted by an immediate.
    DataProcRegShiftImm,
    /// Data processing with register shifted by a register.
    DataProcRegShiftReg,
    /// LDR/STR(B) with 12-bit immediate offset.
    LoadStoreImm,
    /// LDR/STR(B) with shifted register offset.
    LoadStoreReg,
    /// LDRH/STRH with register offset.
    HalfwordReg,
    /// LDRH/STRH with split 8-bit immediate.
    HalfwordImm,
    /// LDRSB with register offset.
    SignedByteReg,
    /// LDRSB with split 8-bit immediate.
    SignedByteImm,
    /// LDRSH with register offset.
    SignedHalfReg,
    /// LDRSH with split 8-bit immediate.
    SignedHalfImm,
    /// LDM/STM.
    BlockTransfer,
    /// B/BL.
    Branch,
    /// BX/BLX register.
    BranchExchange,
    /// MUL/MLA.
    Multiply,
    /// UMULL/UMLAL/SMULL/SMLAL.
    MultiplyLong,
    /// SWP/SWPB.
    Swap,
    /// Move status register to register.
    Mrs,
    /// Move register or immediate to status register.
    Msr,
    /// MCR/MRC.
    CoprocessorTransfer,
    /// Count leading zeros.
    Clz,
    /// SWI.
    SoftwareInterrupt,
    /// Anything else; raises the undefined instruction exception.
    Undefined,
}

impl InstructionShape {
    /// Whether the shape is one of the halfword / signed transfer forms.
    #[must_use]
    pub const fn is_extra_load_store(self) -> bool {
        matches!(
            self,
            Self::HalfwordReg
                | Self::HalfwordImm
                | Self::SignedByteReg
                | Self::SignedByteImm
                | Self::SignedHalfReg
                | Self::SignedHalfImm
        )
    }
}

const fn bit(word: u32, n: u32) -> bool {
    (word >> n) & 1 != 0
}

/// Classifies an instruction word into its shape.
///
/// Bits 27:25 select the primary class; the remaining tests follow the
/// architectural encoding tables bit for bit.
#[must_use]
pub const fn classify(word: u32) -> InstructionShape {
    match (word >> 25) & 0x7 {
        0b000 => classify_class0(word),
        0b001 => {
            if (word >> 23) & 0x3 == 0b10 && !bit(word, 20) {
                if bit(word, 21) {
                    InstructionShape::Msr
                } else {
                    InstructionShape::Undefined
                }
            } else {
                InstructionShape::DataProcImm
            }
        }
        0b010 => InstructionShape::LoadStoreImm,
        0b011 => {
            if bit(word, 4) {
                InstructionShape::Undefined
            } else {
                InstructionShape::LoadStoreReg
            }
        }
        0b100 => InstructionShape::BlockTransfer,
        0b101 => InstructionShape::Branch,
        0b110 => InstructionShape::Undefined,
        _ => {
            if bit(word, 24) {
                InstructionShape::SoftwareInterrupt
            } else if bit(word, 4) {
                InstructionShape::CoprocessorTransfer
            } else {
                InstructionShape::Undefined
            }
        }
    }
}

const fn classify_class0(word: u32) -> InstructionShape {
    let low_nibble = (word >> 4) & 0xF;

    if low_nibble == 0b1001 {
        return match (word >> 23) & 0x3 {
            0b00 if !bit(word, 22) => InstructionShape::Multiply,
            0b01 => InstructionShape::MultiplyLong,
            0b10 if (word >> 20) & 0x3 == 0 => InstructionShape::Swap,
            _ => InstructionShape::Undefined,
        };
    }

    if bit(word, 7) && bit(word, 4) {
        let immediate = bit(word, 22);
        return match ((word >> 5) & 0x3, immediate) {
            (0b01, false) => InstructionShape::HalfwordReg,
            (0b01, true) => InstructionShape::HalfwordImm,
            (0b10, false) => InstructionShape::SignedByteReg,
            (0b10, true) => InstructionShape::SignedByteImm,
            (0b11, false) => InstructionShape::SignedHalfReg,
            (0b11, true) => InstructionShape::SignedHalfImm,
            _ => InstructionShape::Undefined,
        };
    }

    if (word >> 23) & 0x3 == 0b10 && !bit(word, 20) {
        let op = (word >> 21) & 0x3;
        return match (low_nibble, op) {
            (0b0000, 0b00 | 0b10) => InstructionShape::Mrs,
            (0b0000, 0b01 | 0b11) => InstructionShape::Msr,
            (0b0001 | 0b0011, 0b01) => InstructionShape::BranchExchange,
            (0b0001, 0b11) => InstructionShape::Clz,
            _ => InstructionShape::Undefined,
        };
    }

    if bit(word, 4) {
        InstructionShape::DataProcRegShiftReg
    } else {
        InstructionShape::DataProcRegShiftImm
    }
}

/// Condition field, bits 31:28.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Condition {
    /// Z set.
    Eq = 0x0,
    /// Z clear.
    Ne = 0x1,
    /// C set.
    Cs = 0x2,
    /// C clear.
    Cc = 0x3,
    /// N set.
    Mi = 0x4,
    /// N clear.
    Pl = 0x5,
    /// V set.
    Vs = 0x6,
    /// V clear.
    Vc = 0x7,
    /// C set and Z clear.
    Hi = 0x8,
    /// C clear or Z set.
    Ls = 0x9,
    /// N equals V.
    Ge = 0xA,
    /// N differs from V.
    Lt = 0xB,
    /// Z clear and N equals V.
    Gt = 0xC,
    /// Z set or N differs from V.
    Le = 0xD,
    /// Always.
    Al = 0xE,
    /// Reserved; never executes.
    Nv = 0xF,
}

impl Condition {
    /// Decodes the top nibble of an instruction word.
    #[must_use]
    pub const fn from_word(word: u32) -> Self {
        match word >> 28 {
            0x0 => Self::Eq,
            0x1 => Self::Ne,
            0x2 => Self::Cs,
            0x3 => Self::Cc,
            0x4 => Self::Mi,
            0x5 => Self::Pl,
            0x6 => Self::Vs,
            0x7 => Self::Vc,
            0x8 => Self::Hi,
            0x9 => Self::Ls,
            0xA => Self::Ge,
            0xB => Self::Lt,
            0xC => Self::Gt,
            0xD => Self::Le,
            0xE => Self::Al,
            _ => Self::Nv,
        }
    }

    /// Evaluates the condition against the flags of `psr`.
    #[must_use]
    pub const fn passed(self, psr: StatusWord) -> bool {
        let (n, z, c, v) = (psr.negative(), psr.zero(), psr.carry(), psr.overflow());
        match self {
            Self::Eq => z,
            Self::Ne => !z,
            Self::Cs => c,
            Self::Cc => !c,
            Self::Mi => n,
            Self::Pl => !n,
            Self::Vs => v,
            Self::Vc => !v,
            Self::Hi => c && !z,
            Self::Ls => !c || z,
            Self::Ge => n == v,
            Self::Lt => n != v,
            Self::Gt => !z && n == v,
            Self::Le => z || n != v,
            Self::Al => true,
            Self::Nv => false,
        }
    }
}

/// Data-processing opcode, bits 24:21.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum DataOpcode {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl DataOpcode {
    /// Decodes bits 24:21 of a data-processing word.
    #[must_use]
    pub const fn from_word(word: u32) -> Self {
        match (word >> 21) & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            _ => Self::Mvn,
        }
    }

    /// TST, TEQ, CMP and CMN write flags only.
    #[must_use]
    pub const fn is_compare(self) -> bool {
        (self as u8) >> 2 == 0b10
    }

    /// MOV and MVN take no first operand.
    #[must_use]
    pub const fn ignores_rn(self) -> bool {
        matches!(self, Self::Mov | Self::Mvn)
    }

    /// Logical opcodes take C from the shifter and leave V alone.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Eor
                | Self::Tst
                | Self::Teq
                | Self::Orr
                | Self::Mov
                | Self::Bic
                | Self::Mvn
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PSR_C, PSR_Z};
    use rstest::rstest;

    #[rstest]
    #[case(0xE3A0_0005, InstructionShape::DataProcImm)]
    #[case(0xE080_0001, InstructionShape::DataProcRegShiftImm)]
    #[case(0xE080_0311, InstructionShape::DataProcRegShiftReg)]
    #[case(0xE591_0004, InstructionShape::LoadStoreImm)]
    #[case(0xE791_0002, InstructionShape::LoadStoreReg)]
    #[case(0xE191_00B2, InstructionShape::HalfwordReg)]
    #[case(0xE1D1_00B4, InstructionShape::HalfwordImm)]
    #[case(0xE191_00D2, InstructionShape::SignedByteReg)]
    #[case(0xE1D1_00D4, InstructionShape::SignedByteImm)]
    #[case(0xE191_00F2, InstructionShape::SignedHalfReg)]
    #[case(0xE1D1_00F4, InstructionShape::SignedHalfImm)]
    #[case(0xE8BD_8010, InstructionShape::BlockTransfer)]
    #[case(0xEAFF_FFFE, InstructionShape::Branch)]
    #[case(0xE12F_FF1E, InstructionShape::BranchExchange)]
    #[case(0xE12F_FF33, InstructionShape::BranchExchange)]
    #[case(0xE000_0291, InstructionShape::Multiply)]
    #[case(0xE0C1_0392, InstructionShape::MultiplyLong)]
    #[case(0xE102_0091, InstructionShape::Swap)]
    #[case(0xE10F_0000, InstructionShape::Mrs)]
    #[case(0xE129_F000, InstructionShape::Msr)]
    #[case(0xE328_F20F, InstructionShape::Msr)]
    #[case(0xEE11_0F10, InstructionShape::CoprocessorTransfer)]
    #[case(0xE16F_0F11, InstructionShape::Clz)]
    #[case(0xEF00_0011, InstructionShape::SoftwareInterrupt)]
    #[case(0xE7F0_00F0, InstructionShape::Undefined)]
    #[case(0xEC00_0000, InstructionShape::Undefined)]
    #[case(0xE300_0000, InstructionShape::Undefined)]
    fn classify_matches_encoding_table(#[case] word: u32, #[case] shape: InstructionShape) {
        assert_eq!(classify(word), shape);
    }

    #[rstest]
    #[case(Condition::Eq, true)]
    #[case(Condition::Ne, false)]
    #[case(Condition::Cs, true)]
    #[case(Condition::Cc, false)]
    #[case(Condition::Mi, false)]
    #[case(Condition::Pl, true)]
    #[case(Condition::Vs, false)]
    #[case(Condition::Vc, true)]
    #[case(Condition::Hi, false)]
    #[case(Condition::Ls, true)]
    #[case(Condition::Ge, true)]
    #[case(Condition::Lt, false)]
    #[case(Condition::Gt, false)]
    #[case(Condition::Le, true)]
    #[case(Condition::Al, true)]
    #[case(Condition::Nv, false)]
    fn condition_matrix_for_z_and_c_set(#[case] cond: Condition, #[case] expected: bool) {
        let psr = StatusWord::new(PSR_Z | PSR_C);
        assert_eq!(cond.passed(psr), expected);
        assert_eq!(Condition::from_word((cond as u32) << 28), cond);
    }

    #[test]
    fn compare_class_is_opcodes_eight_to_eleven() {
        for bits in 0u32..16 {
            let op = DataOpcode::from_word(bits << 21);
            assert_eq!(op.is_compare(), (8..=11).contains(&bits));
        }
        assert!(DataOpcode::Mov.ignores_rn());
        assert!(!DataOpcode::Cmp.ignores_rn());
        assert!(DataOpcode::Teq.is_logical());
        assert!(!DataOpcode::Rsc.is_logical());
    }
}
