//! Operand and address helpers shared by the execution handlers.

use crate::alu::{shift, ShiftMode, ShiftType};
use crate::decoder::DecodedInstruction;
use crate::encoding::InstructionShape;
use crate::state::{RegisterFile, PC};
use crate::{CoreError, CpuState};

/// Reads an operand register. In the register-shift-by-register form a PC
/// operand reads one word further ahead (instruction address + 12).
pub const fn read_operand(regs: &RegisterFile, id: usize, shape: InstructionShape) -> u32 {
    let value = regs.read(id);
    if id == PC && matches!(shape, InstructionShape::DataProcRegShiftReg) {
        value.wrapping_add(4)
    } else {
        value
    }
}

/// Computes the second data-processing operand and the shifter carry out.
pub const fn operand2(regs: &RegisterFile, instr: &DecodedInstruction) -> (u32, bool) {
    let carry_in = regs.cpsr().carry();
    match instr.shape {
        InstructionShape::DataProcImm => shift(
            instr.imm8,
            instr.rotate,
            ShiftType::Ror,
            ShiftMode::Immediate32,
            carry_in,
        ),
        InstructionShape::DataProcRegShiftReg => {
            let amount = read_operand(regs, instr.rs, instr.shape) & 0xFF;
            shift(
                read_operand(regs, instr.rm, instr.shape),
                amount,
                instr.shift_type,
                ShiftMode::Register8,
                carry_in,
            )
        }
        _ => shift(
            regs.read(instr.rm),
            instr.shift_imm,
            instr.shift_type,
            ShiftMode::Immediate5,
            carry_in,
        ),
    }
}

/// Applies the U bit to a base address.
pub const fn offset_address(base: u32, offset: u32, up: bool) -> u32 {
    if up {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    }
}

/// Writes a value that lands in r15 as a branch target.
pub const fn write_destination(regs: &mut RegisterFile, id: usize, value: u32) {
    if id == PC {
        regs.set_pc(value & !0x3);
    } else {
        regs.write(id, value);
    }
}

/// Copies the current mode's SPSR into CPSR. Modes without an SPSR keep
/// CPSR unchanged.
///
/// # Errors
///
/// A restored status word selecting Thumb state is host-fatal.
pub fn restore_cpsr(state: &mut CpuState) -> Result<(), CoreError> {
    let Some(spsr) = state.regs.spsr() else {
        return Ok(());
    };
    if spsr.thumb() {
        return Err(CoreError::ThumbUnsupported {
            target: state.regs.pc(),
        });
    }
    state.regs.set_cpsr(spsr);
    Ok(())
}

/// Number of leading zero bits, by halving the search window.
pub const fn count_leading_zeros(value: u32) -> u32 {
    if value == 0 {
        return 32;
    }
    let mut value = value;
    let mut count = 0;
    if value & 0xFFFF_0000 == 0 {
        count += 16;
        value <<= 16;
    }
    if value & 0xFF00_0000 == 0 {
        count += 8;
        value <<= 8;
    }
    if value & 0xF000_0000 == 0 {
        count += 4;
        value <<= 4;
    }
    if value & 0xC000_0000 == 0 {
        count += 2;
        value <<= 2;
    }
    if value & 0x8000_0000 == 0 {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn halving_count_matches_hardware(value in any::<u32>()) {
            prop_assert_eq!(count_leading_zeros(value), value.leading_zeros());
        }
    }

    #[test]
    fn pc_reads_further_ahead_in_register_shift_form() {
        let mut regs = RegisterFile::default();
        regs.set_pc(0x104);
        assert_eq!(read_operand(&regs, PC, InstructionShape::DataProcRegShiftImm), 0x108);
        assert_eq!(read_operand(&regs, PC, InstructionShape::DataProcRegShiftReg), 0x10C);
    }

    #[test]
    fn destination_pc_is_word_aligned() {
        let mut regs = RegisterFile::default();
        write_destination(&mut regs, PC, 0x2003);
        assert_eq!(regs.pc(), 0x2000);
    }
}
