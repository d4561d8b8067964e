use super::flags::FlagsUpdate;
use crate::decoder::DecodedInstruction;
use crate::CpuState;

// Multiplies swap the usual field roles: bits 19:16 name the destination
// (RdHi for long forms) and bits 15:12 the accumulator (RdLo).

/// MUL and MLA.
pub(super) fn short(state: &mut CpuState, instr: &DecodedInstruction) {
    let regs = &mut state.regs;
    let product = regs.read(instr.rm).wrapping_mul(regs.read(instr.rs));
    let result = if instr.write_back {
        product.wrapping_add(regs.read(instr.rd))
    } else {
        product
    };
    regs.write(instr.rn, result);
    if instr.set_flags {
        FlagsUpdate::NegativeZero(result).apply(regs.cpsr_mut());
    }
}

/// UMULL, UMLAL, SMULL and SMLAL.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
pub(super) fn long(state: &mut CpuState, instr: &DecodedInstruction) {
    let regs = &mut state.regs;
    let (rm, rs) = (regs.read(instr.rm), regs.read(instr.rs));
    let product = if instr.bit22 {
        (i64::from(rm as i32) * i64::from(rs as i32)) as u64
    } else {
        u64::from(rm) * u64::from(rs)
    };
    let result = if instr.write_back {
        let accumulator = (u64::from(regs.read(instr.rn)) << 32) | u64::from(regs.read(instr.rd));
        product.wrapping_add(accumulator)
    } else {
        product
    };
    let (hi, lo) = ((result >> 32) as u32, result as u32);
    regs.write(instr.rd, lo);
    regs.write(instr.rn, hi);
    if instr.set_flags {
        let psr = regs.cpsr_mut();
        psr.set_negative(hi & 0x8000_0000 != 0);
        psr.set_zero(result == 0);
    }
}
