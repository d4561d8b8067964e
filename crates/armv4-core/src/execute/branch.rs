use crate::decoder::DecodedInstruction;
use crate::state::{LR, PC};
use crate::{CoreError, CpuState};

/// B and BL. The offset is relative to r15 (instruction address + 8).
pub(super) fn relative(state: &mut CpuState, instr: &DecodedInstruction) {
    let regs = &mut state.regs;
    let target = regs.read(PC).wrapping_add(instr.branch_offset);
    // L bit (24).
    if instr.pre_index {
        regs.write(LR, regs.pc());
    }
    regs.set_pc(target);
}

/// BX and BLX (register). Only ARM-state targets are supported.
pub(super) fn exchange(state: &mut CpuState, instr: &DecodedInstruction) -> Result<(), CoreError> {
    let regs = &mut state.regs;
    let target = regs.read(instr.rm);
    if target & 0x3 != 0 {
        return Err(CoreError::ThumbUnsupported { target });
    }
    // Bits 7:4 = 0b0011 selects the linking form.
    if (instr.word >> 4) & 0xF == 0x3 {
        regs.write(LR, regs.pc());
    }
    regs.set_pc(target);
    Ok(())
}
