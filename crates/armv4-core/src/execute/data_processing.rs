use super::flags::FlagsUpdate;
use super::helpers::{operand2, read_operand, restore_cpsr, write_destination};
use crate::alu::{add_with_carry, sub_with_carry};
use crate::decoder::DecodedInstruction;
use crate::encoding::DataOpcode;
use crate::state::PC;
use crate::{CoreError, CpuState};

/// Executes one of the sixteen data-processing opcodes.
///
/// With S set and Rd = r15 on a non-compare opcode, CPSR is restored from
/// SPSR instead of receiving the computed flags.
pub(super) fn execute(state: &mut CpuState, instr: &DecodedInstruction) -> Result<(), CoreError> {
    let regs = &state.regs;
    let carry_in = regs.cpsr().carry();
    let (op2, shifter_carry) = operand2(regs, instr);
    let op1 = if instr.opcode.ignores_rn() {
        0
    } else {
        read_operand(regs, instr.rn, instr.shape)
    };

    let logical = |result: u32| {
        (
            result,
            FlagsUpdate::Logical {
                result,
                carry: shifter_carry,
            },
        )
    };
    let arithmetic = |out: crate::alu::AdderOutput| (out.result, FlagsUpdate::Arithmetic(out));

    let (result, flags) = match instr.opcode {
        DataOpcode::And | DataOpcode::Tst => logical(op1 & op2),
        DataOpcode::Eor | DataOpcode::Teq => logical(op1 ^ op2),
        DataOpcode::Orr => logical(op1 | op2),
        DataOpcode::Mov => logical(op2),
        DataOpcode::Bic => logical(op1 & !op2),
        DataOpcode::Mvn => logical(!op2),
        DataOpcode::Sub | DataOpcode::Cmp => arithmetic(sub_with_carry(op1, op2, true)),
        DataOpcode::Rsb => arithmetic(sub_with_carry(op2, op1, true)),
        DataOpcode::Add | DataOpcode::Cmn => arithmetic(add_with_carry(op1, op2, false)),
        DataOpcode::Adc => arithmetic(add_with_carry(op1, op2, carry_in)),
        DataOpcode::Sbc => arithmetic(sub_with_carry(op1, op2, carry_in)),
        DataOpcode::Rsc => arithmetic(sub_with_carry(op2, op1, carry_in)),
    };

    if instr.opcode.is_compare() {
        flags.apply(state.regs.cpsr_mut());
        return Ok(());
    }

    write_destination(&mut state.regs, instr.rd, result);
    if instr.set_flags {
        if instr.rd == PC {
            restore_cpsr(state)?;
        } else {
            flags.apply(state.regs.cpsr_mut());
        }
    }
    Ok(())
}
