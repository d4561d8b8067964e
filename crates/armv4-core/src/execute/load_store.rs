use super::helpers::{offset_address, restore_cpsr, write_destination};
use crate::alu::{shift, ShiftMode};
use crate::decoder::DecodedInstruction;
use crate::encoding::InstructionShape;
use crate::memory::AccessWidth;
use crate::peripherals::PeripheralTable;
use crate::state::PC;
use crate::{CoreError, CpuState};

struct Transfer {
    address: u32,
    write_back: Option<u32>,
    privileged: bool,
}

fn resolve(state: &CpuState, instr: &DecodedInstruction, offset: u32) -> Transfer {
    let base = state.regs.read(instr.rn);
    let adjusted = offset_address(base, offset, instr.up);
    let user_variant = !instr.pre_index && instr.write_back;
    Transfer {
        address: if instr.pre_index { adjusted } else { base },
        write_back: (!instr.pre_index || instr.write_back).then_some(adjusted),
        privileged: state.regs.cpsr().privileged() && !user_variant,
    }
}

fn store_value(state: &CpuState, id: usize) -> u32 {
    // Stored PC is the instruction address + 12.
    if id == PC {
        state.regs.read(PC).wrapping_add(4)
    } else {
        state.regs.read(id)
    }
}

/// LDR, STR, LDRB and STRB.
pub(super) fn single(
    state: &mut CpuState,
    devices: &mut PeripheralTable,
    instr: &DecodedInstruction,
) -> Result<(), CoreError> {
    let offset = if instr.shape == InstructionShape::LoadStoreImm {
        instr.imm12
    } else {
        shift(
            state.regs.read(instr.rm),
            instr.shift_imm,
            instr.shift_type,
            ShiftMode::Immediate5,
            state.regs.cpsr().carry(),
        )
        .0
    };
    let transfer = resolve(state, instr, offset);
    let width = if instr.bit22 {
        AccessWidth::Byte
    } else {
        AccessWidth::Word
    };

    if instr.load {
        let raw = state.read(devices, transfer.privileged, transfer.address, true, width)?;
        let value = match width {
            AccessWidth::Word => raw.rotate_right(8 * (transfer.address & 0x3)),
            _ => raw,
        };
        if let Some(base) = transfer.write_back {
            state.regs.write(instr.rn, base);
        }
        write_destination(&mut state.regs, instr.rd, value);
    } else {
        let value = store_value(state, instr.rd) & width.value_mask();
        state.write(devices, transfer.privileged, transfer.address, value, width)?;
        if let Some(base) = transfer.write_back {
            state.regs.write(instr.rn, base);
        }
    }
    Ok(())
}

/// LDRH, STRH, LDRSB and LDRSH.
pub(super) fn extra(
    state: &mut CpuState,
    devices: &mut PeripheralTable,
    instr: &DecodedInstruction,
) -> Result<(), CoreError> {
    let offset = match instr.shape {
        InstructionShape::HalfwordImm
        | InstructionShape::SignedByteImm
        | InstructionShape::SignedHalfImm => instr.split_imm8,
        _ => state.regs.read(instr.rm),
    };
    let signed = !matches!(
        instr.shape,
        InstructionShape::HalfwordImm | InstructionShape::HalfwordReg
    );
    if signed && !instr.load {
        return Err(CoreError::UnsupportedStore { word: instr.word });
    }

    let transfer = resolve(state, instr, offset);
    let width = match instr.shape {
        InstructionShape::SignedByteImm | InstructionShape::SignedByteReg => AccessWidth::Byte,
        _ => AccessWidth::Halfword,
    };

    if instr.load {
        let raw = state.read(devices, transfer.privileged, transfer.address, true, width)?;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            clippy::cast_sign_loss
        )]
        let value = match (signed, width) {
            (true, AccessWidth::Byte) => i32::from(raw as u8 as i8) as u32,
            (true, _) => i32::from(raw as u16 as i16) as u32,
            (false, _) => raw,
        };
        if let Some(base) = transfer.write_back {
            state.regs.write(instr.rn, base);
        }
        write_destination(&mut state.regs, instr.rd, value);
    } else {
        let value = store_value(state, instr.rd) & width.value_mask();
        state.write(devices, transfer.privileged, transfer.address, value, width)?;
        if let Some(base) = transfer.write_back {
            state.regs.write(instr.rn, base);
        }
    }
    Ok(())
}

/// SWP and SWPB: read the old value, then store Rm.
pub(super) fn swap(
    state: &mut CpuState,
    devices: &mut PeripheralTable,
    instr: &DecodedInstruction,
) -> Result<(), CoreError> {
    let address = state.regs.read(instr.rn);
    let privileged = state.regs.cpsr().privileged();
    let width = if instr.bit22 {
        AccessWidth::Byte
    } else {
        AccessWidth::Word
    };
    let raw = state.read(devices, privileged, address, true, width)?;
    let old = match width {
        AccessWidth::Word => raw.rotate_right(8 * (address & 0x3)),
        _ => raw,
    };
    let value = state.regs.read(instr.rm) & width.value_mask();
    state.write(devices, privileged, address, value, width)?;
    write_destination(&mut state.regs, instr.rd, old);
    Ok(())
}

/// LDM and STM in all four addressing modes.
///
/// The lowest-numbered register always uses the lowest address. Loaded
/// values are committed only after every read has succeeded.
pub(super) fn block(
    state: &mut CpuState,
    devices: &mut PeripheralTable,
    instr: &DecodedInstruction,
) -> Result<(), CoreError> {
    let list = instr.register_list;
    let span = list.count_ones() * 4;
    let base = state.regs.read(instr.rn);
    let start = match (instr.pre_index, instr.up) {
        (false, true) => base,
        (true, true) => base.wrapping_add(4),
        (false, false) => base.wrapping_sub(span).wrapping_add(4),
        (true, false) => base.wrapping_sub(span),
    };
    let new_base = offset_address(base, span, instr.up);
    let includes_pc = list & (1 << PC) != 0;
    let user_bank = instr.bit22 && !(instr.load && includes_pc);
    let privileged = state.regs.cpsr().privileged();
    let registers = (0..16usize).filter(|id| list & (1 << id) != 0);

    if instr.load {
        let mut loaded = [0u32; 16];
        let mut address = start;
        for id in registers.clone() {
            loaded[id] = state.read(devices, privileged, address, true, AccessWidth::Word)?;
            address = address.wrapping_add(4);
        }
        if instr.write_back {
            state.regs.write(instr.rn, new_base);
        }
        for id in registers {
            if user_bank {
                state.regs.write_user(id, loaded[id]);
            } else {
                write_destination(&mut state.regs, id, loaded[id]);
            }
        }
        if instr.bit22 && includes_pc {
            restore_cpsr(state)?;
        }
    } else {
        let mut address = start;
        for id in registers {
            let value = if id == PC {
                store_value(state, PC)
            } else if user_bank {
                state.regs.read_user(id)
            } else {
                state.regs.read(id)
            };
            state.write(devices, privileged, address, value, AccessWidth::Word)?;
            address = address.wrapping_add(4);
        }
        if instr.write_back {
            state.regs.write(instr.rn, new_base);
        }
    }
    Ok(())
}
