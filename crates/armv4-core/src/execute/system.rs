use super::helpers::{count_leading_zeros, write_destination};
use crate::alu::{shift, ShiftMode, ShiftType};
use crate::decoder::{DecodedInstruction, PendingEvent};
use crate::state::{StatusWord, PC, PSR_FLAGS_MASK, PSR_T};
use crate::CpuState;

const CP15: u32 = 15;

/// Byte lanes selected by the four MSR field-mask bits (c, x, s, f).
const fn field_bytes(mask: u32) -> u32 {
    let mut bytes = 0;
    let mut lane = 0;
    while lane < 4 {
        if mask & (1 << lane) != 0 {
            bytes |= 0xFF << (lane * 8);
        }
        lane += 1;
    }
    bytes
}

/// MRS: copies CPSR, or SPSR when R is set, into Rd.
pub(super) fn mrs(state: &mut CpuState, instr: &DecodedInstruction) {
    let regs = &mut state.regs;
    let psr = if instr.bit22 {
        regs.spsr().unwrap_or_else(|| regs.cpsr())
    } else {
        regs.cpsr()
    };
    regs.write(instr.rd, psr.raw());
}

/// MSR from a register or a rotated immediate.
///
/// User mode may only write the flag byte of CPSR. The T bit is never
/// written. SPSR writes are dropped in modes without an SPSR.
pub(super) fn msr(state: &mut CpuState, instr: &DecodedInstruction) {
    let regs = &mut state.regs;
    let value = if instr.word & (1 << 25) != 0 {
        shift(
            instr.imm8,
            instr.rotate,
            ShiftType::Ror,
            ShiftMode::Immediate32,
            false,
        )
        .0
    } else {
        regs.read(instr.rm)
    };
    let mut mask = field_bytes(instr.field_mask) & !PSR_T;

    if instr.bit22 {
        if let Some(spsr) = regs.spsr() {
            let merged = (spsr.raw() & !mask) | (value & mask);
            regs.set_spsr(StatusWord::new(merged));
        }
        return;
    }

    let cpsr = regs.cpsr();
    if !cpsr.privileged() {
        mask &= 0xFF00_0000;
    }
    regs.set_cpsr(StatusWord::new((cpsr.raw() & !mask) | (value & mask)));
}

/// MCR and MRC. Only CP15 in a privileged mode is implemented; everything
/// else is an undefined instruction.
pub(super) fn coprocessor(state: &mut CpuState, instr: &DecodedInstruction) {
    if instr.cp_num != CP15 || !state.regs.cpsr().privileged() {
        state.decoder.pending = PendingEvent::Undefined;
        return;
    }
    if instr.load {
        let value = state.mmu.read_register(instr.cp_crn, instr.cp_opc2);
        if instr.rd == PC {
            let psr = state.regs.cpsr_mut();
            psr.set_raw((psr.raw() & !PSR_FLAGS_MASK) | (value & PSR_FLAGS_MASK));
        } else {
            state.regs.write(instr.rd, value);
        }
    } else {
        let value = state.regs.read(instr.rd);
        state.mmu.write_register(instr.cp_crn, instr.cp_crm, instr.cp_opc2, value);
    }
}

/// CLZ.
pub(super) fn clz(state: &mut CpuState, instr: &DecodedInstruction) {
    let count = count_leading_zeros(state.regs.read(instr.rm));
    write_destination(&mut state.regs, instr.rd, count);
}
