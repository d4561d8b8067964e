//! Instruction decoder for the ARMv4 instruction set.
//!
//! Decoding happens in two steps: [`classify`] picks the instruction shape,
//! then [`Decoder::decode`] extracts every bitfield once into a
//! [`DecodedInstruction`]. Handlers read only the fields that are valid for
//! the shape they implement.

#![allow(missing_docs)]

use crate::alu::ShiftType;
use crate::encoding::{classify, Condition, DataOpcode, InstructionShape};

/// Decoded instruction with all fields extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DecodedInstruction {
    /// Raw instruction word.
    pub word: u32,
    pub cond: Condition,
    pub shape: InstructionShape,
    /// Bits 19:16.
    pub rn: usize,
    /// Bits 15:12.
    pub rd: usize,
    /// Bits 11:8.
    pub rs: usize,
    /// Bits 3:0.
    pub rm: usize,
    pub opcode: DataOpcode,
    /// S bit for data processing and multiplies, L bit for transfers (bit 20).
    pub set_flags: bool,
    /// P bit (bit 24).
    pub pre_index: bool,
    /// U bit (bit 23).
    pub up: bool,
    /// B bit for single transfers, S bit for block transfers, R bit for MSR/MRS (bit 22).
    pub bit22: bool,
    /// W bit (bit 21).
    pub write_back: bool,
    /// L bit (bit 20).
    pub load: bool,
    pub shift_type: ShiftType,
    /// Bits 11:7.
    pub shift_imm: u32,
    /// Rotated-immediate rotation, already doubled.
    pub rotate: u32,
    /// Bits 7:0.
    pub imm8: u32,
    /// Bits 11:0.
    pub imm12: u32,
    /// Halfword transfer immediate assembled from bits 11:8 and 3:0.
    pub split_imm8: u32,
    /// Bits 15:0.
    pub register_list: u16,
    /// Sign-extended 24-bit branch offset shifted left by two.
    pub branch_offset: u32,
    /// Bits 19:16 as an MSR field mask.
    pub field_mask: u32,
    /// Coprocessor number, bits 11:8.
    pub cp_num: u32,
    /// Coprocessor opcode 1, bits 23:21.
    pub cp_opc1: u32,
    /// Coprocessor opcode 2, bits 7:5.
    pub cp_opc2: u32,
    /// Coprocessor register CRn, bits 19:16.
    pub cp_crn: u32,
    /// Coprocessor register CRm, bits 3:0.
    pub cp_crm: u32,
    /// SWI comment field, bits 23:0.
    pub comment: u32,
}

/// Stateless ARM decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes an instruction word.
    #[must_use]
    #[allow(
        clippy::similar_names,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    pub fn decode(word: u32) -> DecodedInstruction {
        let bit = |n: u32| (word >> n) & 1 != 0;
        let field = |lsb: u32, mask: u32| (word >> lsb) & mask;

        DecodedInstruction {
            word,
            cond: Condition::from_word(word),
            shape: classify(word),
            rn: field(16, 0xF) as usize,
            rd: field(12, 0xF) as usize,
            rs: field(8, 0xF) as usize,
            rm: field(0, 0xF) as usize,
            opcode: DataOpcode::from_word(word),
            set_flags: bit(20),
            pre_index: bit(24),
            up: bit(23),
            bit22: bit(22),
            write_back: bit(21),
            load: bit(20),
            shift_type: ShiftType::from_bits(field(5, 0x3)),
            shift_imm: field(7, 0x1F),
            rotate: field(8, 0xF) * 2,
            imm8: field(0, 0xFF),
            imm12: field(0, 0xFFF),
            split_imm8: (field(8, 0xF) << 4) | field(0, 0xF),
            register_list: field(0, 0xFFFF) as u16,
            branch_offset: ((((word & 0x00FF_FFFF) << 8) as i32) >> 6) as u32,
            field_mask: field(16, 0xF),
            cp_num: field(8, 0xF),
            cp_opc1: field(21, 0x7),
            cp_opc2: field(5, 0x7),
            cp_crn: field(16, 0xF),
            cp_crm: field(0, 0xF),
            comment: field(0, 0x00FF_FFFF),
        }
    }
}

/// Exception raised by the current instruction, dispatched at the end of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PendingEvent {
    #[default]
    None,
    PrefetchAbort,
    DataAbort,
    Undefined,
    SoftwareInterrupt,
}

/// Decode-stage state kept between fetch and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DecoderState {
    /// Last fetched word.
    pub word: u32,
    /// Virtual address the word was fetched from.
    pub address: u32,
    /// Shape of the last fetched word, `None` after a failed fetch.
    pub shape: Option<InstructionShape>,
    pub pending: PendingEvent,
}
