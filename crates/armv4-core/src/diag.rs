//! Diagnostics: exception counters and the register dump printed on halt.

use std::fmt;

use crate::execute::ExceptionKind;
use crate::mmu::TlbStats;
use crate::state::{StatusWord, REGISTER_COUNT};
use crate::CpuState;

/// The most recent prefetch or data abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AbortRecord {
    /// Address of the instruction that aborted.
    pub pc: u32,
    /// Fault status register at the time of the abort.
    pub fsr: u32,
    /// Fault address register at the time of the abort.
    pub far: u32,
}

/// Saturating exception entry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DiagCounters {
    /// Entries per [`ExceptionKind`], indexed by [`ExceptionKind::index`].
    pub exceptions: [u64; 6],
    /// Last abort taken, if any.
    pub last_abort: Option<AbortRecord>,
}

impl DiagCounters {
    /// Counts one entry into `kind`.
    pub const fn record_exception(&mut self, kind: ExceptionKind) {
        let slot = &mut self.exceptions[kind.index()];
        *slot = slot.saturating_add(1);
    }

    /// Records an abort about to be dispatched.
    pub const fn record_abort(&mut self, pc: u32, fsr: u32, far: u32) {
        self.last_abort = Some(AbortRecord { pc, fsr, far });
    }

    /// Entries into `kind` so far.
    #[must_use]
    pub const fn exception_count(&self, kind: ExceptionKind) -> u64 {
        self.exceptions[kind.index()]
    }

    /// Clears every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of the visible registers, formatted for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDump {
    /// r0-r15 as seen in the current mode; r15 is the stored PC.
    pub regs: [u32; REGISTER_COUNT],
    /// Current status word.
    pub cpsr: StatusWord,
    /// SPSR of the current mode, if it has one.
    pub spsr: Option<StatusWord>,
    /// Address of the last fetched instruction.
    pub fetch_address: u32,
    /// Executed instruction count.
    pub instructions: u32,
    /// Translation counters.
    pub tlb: TlbStats,
}

impl RegisterDump {
    /// Captures the state of `cpu`.
    #[must_use]
    pub fn capture(cpu: &CpuState) -> Self {
        let mut regs = [0; REGISTER_COUNT];
        for (id, slot) in regs.iter_mut().enumerate() {
            *slot = cpu.regs.read(id);
        }
        regs[REGISTER_COUNT - 1] = cpu.regs.pc();
        Self {
            regs,
            cpsr: cpu.regs.cpsr(),
            spsr: cpu.regs.spsr(),
            fetch_address: cpu.decoder.address,
            instructions: cpu.instruction_counter,
            tlb: cpu.mmu.stats(),
        }
    }
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.regs.chunks(4).enumerate() {
            for (col, value) in chunk.iter().enumerate() {
                let id = row * 4 + col;
                if col > 0 {
                    f.write_str("  ")?;
                }
                write!(f, "r{id:<2} {value:08x}")?;
            }
            writeln!(f)?;
        }
        write!(f, "cpsr {}", self.cpsr)?;
        if let Some(spsr) = self.spsr {
            write!(f, "  spsr {spsr}")?;
        }
        writeln!(f)?;
        write!(
            f,
            "last fetch {:#010x}, {} instructions, tlb {}/{} hits",
            self.fetch_address, self.instructions, self.tlb.hits, self.tlb.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreConfig;

    #[test]
    fn counters_saturate_per_kind() {
        let mut diag = DiagCounters::default();
        diag.exceptions[ExceptionKind::Irq.index()] = u64::MAX;
        diag.record_exception(ExceptionKind::Irq);
        diag.record_exception(ExceptionKind::SoftwareInterrupt);
        assert_eq!(diag.exception_count(ExceptionKind::Irq), u64::MAX);
        assert_eq!(diag.exception_count(ExceptionKind::SoftwareInterrupt), 1);
        diag.reset();
        assert_eq!(diag, DiagCounters::default());
    }

    #[test]
    fn dump_lists_registers_and_mode() {
        let mut cpu = CpuState::with_config(&CoreConfig::bare_metal());
        cpu.regs.write(4, 0xDEAD_BEEF);
        cpu.regs.set_pc(0x8000);
        let text = RegisterDump::capture(&cpu).to_string();
        assert!(text.contains("r4  deadbeef"));
        assert!(text.contains("r15 00008000"));
        assert!(text.contains("svc"));
        assert_eq!(text.lines().count(), 6);
    }
}
