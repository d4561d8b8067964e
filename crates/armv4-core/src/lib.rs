//! ARMv4 functional CPU core with MMU, TLB and a memory-mapped peripheral bus.

/// Fault status codes and host-fatal errors.
pub mod fault;
pub use fault::{CoreError, FaultClass, FaultStatus, MmuFault};

/// Architectural CPU state: modes, status words and banked registers.
pub mod state;
pub use state::{Mode, ModeClass, RegisterFile, RunState, StatusWord};

/// Barrel shifter and adder.
pub mod alu;
pub use alu::{add_with_carry, shift, sub_with_carry, AdderOutput, ShiftMode, ShiftType};

/// Instruction shape classification and condition codes.
pub mod encoding;
pub use encoding::{classify, Condition, DataOpcode, InstructionShape};

/// Field extraction into a decoded instruction.
pub mod decoder;
pub use decoder::{DecodedInstruction, Decoder, DecoderState, PendingEvent};

/// Physical memory, address map and system bus.
pub mod memory;
pub use memory::{AccessWidth, RegionDescriptor};

/// CP15 registers, page table walker and TLBs.
pub mod mmu;
pub use mmu::{Access, Mmu, TlbSide, TlbStats};

/// Peripheral port and reference devices.
pub mod peripherals;
pub use peripherals::{Peripheral, PeripheralError, PeripheralTable};

/// Public host-facing API.
pub mod api;
pub use api::{CoreConfig, CoreProfile, CpuState, StepOutcome};

/// Exception counters and register dumps.
pub mod diag;
pub use diag::{AbortRecord, DiagCounters, RegisterDump};

/// Approximate per-shape cycle costs.
pub mod timing;
pub use timing::{cycle_cost, CYCLE_COST_TABLE};

/// Instruction execution engine.
pub mod execute;
pub use execute::{execute_instruction, interrupt_exception, step_one, ExceptionKind, FlagsUpdate};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
