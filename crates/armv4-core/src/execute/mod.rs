//! Instruction execution engine.
//!
//! One call to [`step_one`] runs the whole pipeline for a single instruction:
//!
//! 1. Fetch the word at PC through the instruction-side TLB and advance PC.
//! 2. Decode it and evaluate the condition field.
//! 3. Run the handler for its shape.
//! 4. Dispatch any event the handler raised (abort, undefined, SWI).
//! 5. Take a pending IRQ if the I bit allows it.
//!
//! MMU faults come back from the bus as [`CoreError::Abort`] and are turned
//! into prefetch or data aborts here. Every other error is host-fatal: the
//! core latches [`RunState::Halted`] and refuses to step until reset.

mod branch;
mod data_processing;
mod exception;
mod flags;
mod helpers;
mod load_store;
mod multiply;
mod system;

pub use exception::{interrupt_exception, ExceptionKind, HIGH_VECTOR_BASE};
pub use flags::FlagsUpdate;

use crate::decoder::{DecodedInstruction, Decoder, DecoderState, PendingEvent};
use crate::diag::RegisterDump;
use crate::encoding::InstructionShape;
use crate::peripherals::PeripheralTable;
use crate::state::RunState;
use crate::timing::cycle_cost;
use crate::{CoreConfig, CoreError, CpuState, StepOutcome};

/// Runs the handler for an already decoded instruction whose condition
/// passed. Events are left in `state.decoder.pending`.
///
/// # Errors
///
/// Returns [`CoreError::Abort`] when a data access faults, or a host-fatal
/// error.
pub fn execute_instruction(
    state: &mut CpuState,
    devices: &mut PeripheralTable,
    instr: &DecodedInstruction,
) -> Result<(), CoreError> {
    match instr.shape {
        InstructionShape::DataProcImm
        | InstructionShape::DataProcRegShiftImm
        | InstructionShape::DataProcRegShiftReg => data_processing::execute(state, instr)?,
        InstructionShape::LoadStoreImm | InstructionShape::LoadStoreReg => {
            load_store::single(state, devices, instr)?;
        }
        shape if shape.is_extra_load_store() => load_store::extra(state, devices, instr)?,
        InstructionShape::BlockTransfer => load_store::block(state, devices, instr)?,
        InstructionShape::Swap => load_store::swap(state, devices, instr)?,
        InstructionShape::Branch => branch::relative(state, instr),
        InstructionShape::BranchExchange => branch::exchange(state, instr)?,
        InstructionShape::Multiply => multiply::short(state, instr),
        InstructionShape::MultiplyLong => multiply::long(state, instr),
        InstructionShape::Mrs => system::mrs(state, instr),
        InstructionShape::Msr => system::msr(state, instr),
        InstructionShape::CoprocessorTransfer => system::coprocessor(state, instr),
        InstructionShape::Clz => system::clz(state, instr),
        InstructionShape::SoftwareInterrupt => {
            state.decoder.pending = PendingEvent::SoftwareInterrupt;
        }
        _ => state.decoder.pending = PendingEvent::Undefined,
    }
    Ok(())
}

const fn pending_exception(event: PendingEvent) -> Option<ExceptionKind> {
    match event {
        PendingEvent::None => None,
        PendingEvent::PrefetchAbort => Some(ExceptionKind::PrefetchAbort),
        PendingEvent::DataAbort => Some(ExceptionKind::DataAbort),
        PendingEvent::Undefined => Some(ExceptionKind::Undefined),
        PendingEvent::SoftwareInterrupt => Some(ExceptionKind::SoftwareInterrupt),
    }
}

fn run_step(
    state: &mut CpuState,
    devices: &mut PeripheralTable,
    config: &CoreConfig,
) -> Result<StepOutcome, CoreError> {
    let pc = state.regs.pc();
    state.decoder = DecoderState {
        address: pc,
        ..DecoderState::default()
    };

    let mut outcome = match state.fetch(devices, pc) {
        Ok(word) => {
            state.regs.set_pc(pc.wrapping_add(4));
            let instr = Decoder::decode(word);
            state.decoder.word = word;
            state.decoder.shape = Some(instr.shape);
            if config.trace_instructions {
                log::trace!("{pc:#010x}: {word:08x} {:?} {:?}", instr.cond, instr.shape);
            }

            if instr.cond.passed(state.regs.cpsr()) {
                match execute_instruction(state, devices, &instr) {
                    Ok(()) | Err(CoreError::Abort(_)) => {}
                    Err(fatal) => return Err(fatal),
                }
                state.instruction_counter = state.instruction_counter.wrapping_add(1);
                StepOutcome::Retired {
                    cycles: cycle_cost(instr.shape),
                }
            } else {
                StepOutcome::Skipped
            }
        }
        Err(CoreError::Abort(_)) => {
            state.decoder.pending = PendingEvent::PrefetchAbort;
            StepOutcome::Skipped
        }
        Err(fatal) => return Err(fatal),
    };

    // A fault that reached the MMU during execute becomes a data abort.
    if state.mmu.fault_pending() && state.decoder.pending == PendingEvent::None {
        state.decoder.pending = PendingEvent::DataAbort;
    }

    if let Some(kind) = pending_exception(state.decoder.pending) {
        if matches!(
            kind,
            ExceptionKind::PrefetchAbort | ExceptionKind::DataAbort
        ) {
            state.diag.record_abort(
                state.decoder.address,
                state.mmu.fault_status(),
                state.mmu.fault_address(),
            );
            state.mmu.take_fault();
        }
        interrupt_exception(state, kind);
        state.decoder.pending = PendingEvent::None;
        outcome = StepOutcome::Exception { kind };
    }

    if devices.irq_pending() && interrupt_exception(state, ExceptionKind::Irq) {
        outcome = StepOutcome::Exception {
            kind: ExceptionKind::Irq,
        };
    }
    Ok(outcome)
}

/// Executes one instruction and dispatches any resulting exception.
///
/// # Errors
///
/// Returns the host-fatal error that halted the core. Later calls return
/// `Ok(StepOutcome::Halted(..))` without executing.
pub fn step_one(
    state: &mut CpuState,
    devices: &mut PeripheralTable,
    config: &CoreConfig,
) -> Result<StepOutcome, CoreError> {
    if let RunState::Halted(error) = state.run_state {
        return Ok(StepOutcome::Halted(error));
    }
    run_step(state, devices, config).inspect_err(|error| {
        state.run_state = RunState::Halted(*error);
        log::error!("core halted: {error}\n{}", RegisterDump::capture(state));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::AccessWidth;
    use crate::mmu::{reg, CONTROL_A, CONTROL_M};
    use crate::state::{Mode, StatusWord, LR, PSR_C, PSR_I, PSR_N, PSR_V, PSR_Z};
    use rstest::rstest;

    fn machine(program: &[u32]) -> (CpuState, PeripheralTable, CoreConfig) {
        let config = CoreConfig::bare_metal();
        let mut state = CpuState::with_config(&config);
        let bytes: Vec<u8> = program.iter().flat_map(|word| word.to_le_bytes()).collect();
        state.load_image(0, &bytes).expect("program fits");
        (state, PeripheralTable::new(), config)
    }

    fn run(state: &mut CpuState, devices: &mut PeripheralTable, config: &CoreConfig, n: usize) {
        for _ in 0..n {
            step_one(state, devices, config).expect("step");
        }
    }

    #[test]
    fn failed_condition_only_advances_pc() {
        // MOVEQ r0, #1 with Z clear.
        let (mut state, mut devices, config) = machine(&[0x03A0_0001]);
        state.regs.cpsr_mut().set_zero(false);
        let outcome = step_one(&mut state, &mut devices, &config).expect("step");
        assert_eq!(outcome, StepOutcome::Skipped);
        assert_eq!(state.regs.read(0), 0);
        assert_eq!(state.pc(), 4);
    }

    #[test]
    fn instruction_counter_counts_only_executed_instructions() {
        // MOVEQ r0, #1 with Z clear, then MOV r1, #2.
        let (mut state, mut devices, config) = machine(&[0x03A0_0001, 0xE3A0_1002]);
        state.regs.cpsr_mut().set_zero(false);
        step_one(&mut state, &mut devices, &config).expect("step");
        assert_eq!(state.instruction_counter, 0);
        step_one(&mut state, &mut devices, &config).expect("step");
        assert_eq!(state.instruction_counter, 1);
        assert_eq!(state.regs.read(1), 2);
    }

    #[rstest]
    // ADDS r0, r1, r2
    #[case(0xE091_0002, 0xFFFF_FFFF, 1, 0, PSR_Z | PSR_C)]
    // SUBS r0, r1, r2
    #[case(0xE051_0002, 0x8000_0000, 1, 0x7FFF_FFFF, PSR_C | PSR_V)]
    // RSBS r0, r1, r2
    #[case(0xE071_0002, 2, 1, 0xFFFF_FFFF, PSR_N)]
    // ANDS r0, r1, r2
    #[case(0xE011_0002, 0xF0, 0x0F, 0, PSR_Z)]
    fn arithmetic_sets_flags(
        #[case] word: u32,
        #[case] r1: u32,
        #[case] r2: u32,
        #[case] expected: u32,
        #[case] flags: u32,
    ) {
        let (mut state, mut devices, config) = machine(&[word]);
        state.regs.write(1, r1);
        state.regs.write(2, r2);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.regs.read(0), expected);
        assert_eq!(state.regs.cpsr().raw() & (PSR_N | PSR_Z | PSR_C | PSR_V), flags);
    }

    #[test]
    fn compare_leaves_destination_alone() {
        // CMP r1, #5
        let (mut state, mut devices, config) = machine(&[0xE351_0005]);
        state.regs.write(1, 5);
        state.regs.write(0, 0x77);
        run(&mut state, &mut devices, &config, 1);
        assert!(state.regs.cpsr().zero());
        assert_eq!(state.regs.read(0), 0x77);
    }

    #[test]
    fn register_shifted_pc_reads_plus_twelve() {
        // ADD r0, pc, pc, LSL r1 with r1 = 0
        let (mut state, mut devices, config) = machine(&[0xE08F_011F]);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.regs.read(0), 24);
    }

    #[test]
    fn branch_with_link_records_return() {
        // BL +8 (to 0x10)
        let (mut state, mut devices, config) = machine(&[0xEB00_0002]);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.pc(), 0x10);
        assert_eq!(state.regs.read(LR), 4);
    }

    #[test]
    fn bx_to_thumb_halts() {
        // BX r0 with r0 = 0x101
        let (mut state, mut devices, config) = machine(&[0xE12F_FF10]);
        state.regs.write(0, 0x101);
        let error = CoreError::ThumbUnsupported { target: 0x101 };
        assert_eq!(step_one(&mut state, &mut devices, &config), Err(error));
        assert_eq!(state.run_state, RunState::Halted(error));
        assert_eq!(
            step_one(&mut state, &mut devices, &config),
            Ok(StepOutcome::Halted(error))
        );
    }

    #[test]
    fn swi_enters_supervisor() {
        let (mut state, mut devices, config) = machine(&[0xEF00_0042]);
        state.regs.cpsr_mut().set_mode(Mode::User);
        let outcome = step_one(&mut state, &mut devices, &config).expect("step");
        assert_eq!(
            outcome,
            StepOutcome::Exception {
                kind: ExceptionKind::SoftwareInterrupt
            }
        );
        assert_eq!(state.mode(), Some(Mode::Svc));
        assert_eq!(state.pc(), 0x08);
        assert_eq!(state.regs.read(LR), 4);
    }

    #[test]
    fn undefined_word_enters_undefined_mode() {
        let (mut state, mut devices, config) = machine(&[0xE7F0_00F0]);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.mode(), Some(Mode::Undef));
        assert_eq!(state.pc(), 0x04);
    }

    #[test]
    fn user_mode_coprocessor_access_is_undefined() {
        // MRC p15, 0, r0, c0, c0, 0
        let (mut state, mut devices, config) = machine(&[0xEE10_0F10]);
        state.regs.cpsr_mut().set_mode(Mode::User);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.mode(), Some(Mode::Undef));
        assert_eq!(state.regs.read(0), 0);
    }

    #[test]
    fn mrc_reads_main_id() {
        let (mut state, mut devices, config) = machine(&[0xEE10_0F10]);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.regs.read(0), crate::mmu::CP15_MAIN_ID);
    }

    #[test]
    fn mcr_tlb_invalidate_selects_side_by_crm() {
        use crate::mmu::TlbSide;

        // MCR p15, 0, r0, c8, c6, 0: data side only.
        let (mut state, mut devices, config) = machine(&[0xEE08_0F16]);
        state.mmu.tlb_mut(TlbSide::Instruction).insert(0x1000, 0x1000, true, 3);
        state.mmu.tlb_mut(TlbSide::Data).insert(0x1000, 0x1000, true, 3);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.mmu.tlb(TlbSide::Instruction).occupancy(), 1);
        assert_eq!(state.mmu.tlb(TlbSide::Data).occupancy(), 0);
    }

    #[test]
    fn msr_in_user_mode_only_writes_flags() {
        // MSR CPSR_fc, r0
        let (mut state, mut devices, config) = machine(&[0xE129_F000]);
        state.regs.cpsr_mut().set_mode(Mode::User);
        state.regs.write(0, PSR_N | Mode::Svc.bits());
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.mode(), Some(Mode::User));
        assert!(state.regs.cpsr().negative());
    }

    #[test]
    fn mrs_reads_spsr_when_requested() {
        // MRS r0, SPSR
        let (mut state, mut devices, config) = machine(&[0xE14F_0000]);
        state.regs.set_spsr(StatusWord::new(0x6000_0010));
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.regs.read(0), 0x6000_0010);
    }

    #[test]
    fn clz_counts_leading_zeros() {
        // CLZ r0, r1
        let (mut state, mut devices, config) = machine(&[0xE16F_0F11]);
        state.regs.write(1, 0x0001_0000);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.regs.read(0), 15);
    }

    #[test]
    fn multiply_long_signed_accumulates() {
        // SMLAL r0, r1, r2, r3
        let (mut state, mut devices, config) = machine(&[0xE0E1_0392]);
        state.regs.write(2, (-3i32) as u32);
        state.regs.write(3, 5);
        state.regs.write(0, 20);
        state.regs.write(1, 0);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.regs.read(0), 5);
        assert_eq!(state.regs.read(1), 0);
    }

    #[test]
    fn mla_uses_swapped_fields() {
        // MLA r0, r1, r2, r3: r0 = r1 * r2 + r3
        let (mut state, mut devices, config) = machine(&[0xE020_3291]);
        state.regs.write(1, 6);
        state.regs.write(2, 7);
        state.regs.write(3, 8);
        run(&mut state, &mut devices, &config, 1);
        assert_eq!(state.regs.read(0), 50);
    }

    #[test]
    fn irq_is_taken_after_the_instruction() {
        // MOV r0, #1
        let (mut state, _, config) = machine(&[0xE3A0_0001]);
        let mut devices = PeripheralTable::with_standard_devices(1);
        devices.reset_all();
        devices.write(crate::memory::INTC_BASE, 1, AccessWidth::Word);
        devices.write(crate::memory::TIMER_BASE + 4, 1, AccessWidth::Word);
        devices.poll();
        state.regs.cpsr_mut().set_irq_disabled(false);
        let outcome = step_one(&mut state, &mut devices, &config).expect("step");
        assert_eq!(
            outcome,
            StepOutcome::Exception {
                kind: ExceptionKind::Irq
            }
        );
        assert_eq!(state.regs.read(0), 1);
        assert_eq!(state.pc(), 0x18);
        assert_eq!(state.regs.read(LR), 8);
        assert_ne!(state.regs.cpsr().raw() & PSR_I, 0);
    }

    #[test]
    fn data_abort_suppresses_load() {
        // LDR r0, [r1]
        let config = CoreConfig::default();
        let mut state = CpuState::with_config(&config);
        state.load_image(0, &0xE591_0000u32.to_le_bytes()).expect("fits");
        let mut devices = PeripheralTable::new();
        state.mmu.write_register(reg::CONTROL, 0, 0, CONTROL_M | CONTROL_A);
        // Identity section for the first megabyte, manager domain.
        state.mmu.write_register(reg::TTB, 0, 0, 0x4000);
        state.mmu.write_register(reg::DACR, 0, 0, 0x3);
        state.memory[0x4000..0x4004].copy_from_slice(&0x0000_0C02u32.to_le_bytes());
        state.regs.write(1, 0x102);
        state.regs.write(0, 0x55);

        let outcome = step_one(&mut state, &mut devices, &config).expect("step");
        assert_eq!(
            outcome,
            StepOutcome::Exception {
                kind: ExceptionKind::DataAbort
            }
        );
        assert_eq!(state.mode(), Some(Mode::Abort));
        assert_eq!(state.regs.read(LR), 8);
        assert_eq!(state.mmu.fault_status() & 0xF, 0x1);
        assert_eq!(state.mmu.fault_address(), 0x102);
        assert!(!state.mmu.fault_pending());
        state.regs.cpsr_mut().set_mode(Mode::Svc);
        assert_eq!(state.regs.read(0), 0x55);
        let abort = state.diag.last_abort.expect("abort recorded");
        assert_eq!(abort.pc, 0);
        assert_eq!(abort.far, 0x102);
    }

    #[test]
    fn prefetch_abort_leaves_instruction_counter() {
        let config = CoreConfig::default();
        let mut state = CpuState::with_config(&config);
        let mut devices = PeripheralTable::new();
        state.mmu.write_register(reg::TTB, 0, 0, 0x4000);
        state.mmu.write_register(reg::CONTROL, 0, 0, CONTROL_M);
        state.regs.set_pc(0x0010_0000);
        let outcome = step_one(&mut state, &mut devices, &config).expect("step");
        assert_eq!(
            outcome,
            StepOutcome::Exception {
                kind: ExceptionKind::PrefetchAbort
            }
        );
        assert_eq!(state.instruction_counter, 0);
        assert_eq!(state.regs.read(LR), 0x0010_0004);
        assert_eq!(state.mmu.fault_status(), 0x5);
    }
}
