//! Exception entry.

use crate::state::{Mode, LR};
use crate::CpuState;

/// Base of the high exception vector table (c1 V bit).
pub const HIGH_VECTOR_BASE: u32 = 0xFFFF_0000;

/// Exceptions the core can enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExceptionKind {
    /// Reset.
    Reset,
    /// Undefined instruction.
    Undefined,
    /// Software interrupt (SWI).
    SoftwareInterrupt,
    /// Instruction fetch abort.
    PrefetchAbort,
    /// Data access abort.
    DataAbort,
    /// Interrupt request.
    Irq,
}

impl ExceptionKind {
    /// Every kind, in vector order.
    pub const ALL: [Self; 6] = [
        Self::Reset,
        Self::Undefined,
        Self::SoftwareInterrupt,
        Self::PrefetchAbort,
        Self::DataAbort,
        Self::Irq,
    ];

    /// Offset of the vector inside the vector table.
    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::Undefined => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
        }
    }

    /// Mode entered by the exception.
    #[must_use]
    pub const fn mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Svc,
            Self::Undefined => Mode::Undef,
            Self::PrefetchAbort | Self::DataAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
        }
    }

    /// Link register value relative to the stored PC at entry.
    #[must_use]
    pub const fn return_offset(self) -> u32 {
        match self {
            Self::Reset | Self::Undefined | Self::SoftwareInterrupt => 0,
            Self::PrefetchAbort | Self::DataAbort | Self::Irq => 4,
        }
    }

    /// Position in [`ExceptionKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Undefined => "undefined",
            Self::SoftwareInterrupt => "swi",
            Self::PrefetchAbort => "prefetch abort",
            Self::DataAbort => "data abort",
            Self::Irq => "irq",
        }
    }
}

/// Enters exception `kind`. Returns `false` without touching any state when
/// an IRQ arrives with the I bit set.
pub fn interrupt_exception(state: &mut CpuState, kind: ExceptionKind) -> bool {
    let cpsr = state.regs.cpsr();
    if kind == ExceptionKind::Irq && cpsr.irq_disabled() {
        return false;
    }

    let return_address = state.regs.pc().wrapping_add(kind.return_offset());
    let mut entered = cpsr;
    entered.set_mode(kind.mode());
    entered.set_thumb(false);
    entered.set_irq_disabled(true);
    if kind == ExceptionKind::Reset {
        entered.set_fiq_disabled(true);
    }

    state.regs.set_cpsr(entered);
    state.regs.set_spsr(cpsr);
    state.regs.write(LR, return_address);
    let base = if state.mmu.high_vectors() {
        HIGH_VECTOR_BASE
    } else {
        0
    };
    state.regs.set_pc(base | kind.vector());
    state.diag.record_exception(kind);

    log::debug!(
        "{} entered from {:#010x}, cpsr {}",
        kind.name(),
        return_address,
        cpsr
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmu::{reg, CONTROL_V};
    use crate::state::ModeClass;
    use crate::CoreConfig;
    use rstest::rstest;

    fn user_state() -> CpuState {
        let mut state = CpuState::with_config(&CoreConfig::bare_metal());
        let mut cpsr = state.regs.cpsr();
        cpsr.set_mode(Mode::User);
        cpsr.set_irq_disabled(false);
        state.regs.set_cpsr(cpsr);
        state.regs.set_pc(0x1004);
        state
    }

    #[rstest]
    #[case(ExceptionKind::Undefined, Mode::Undef, 0x04, 0x1004)]
    #[case(ExceptionKind::SoftwareInterrupt, Mode::Svc, 0x08, 0x1004)]
    #[case(ExceptionKind::PrefetchAbort, Mode::Abort, 0x0C, 0x1008)]
    #[case(ExceptionKind::DataAbort, Mode::Abort, 0x10, 0x1008)]
    #[case(ExceptionKind::Irq, Mode::Irq, 0x18, 0x1008)]
    fn entry_sets_mode_vector_and_link(
        #[case] kind: ExceptionKind,
        #[case] mode: Mode,
        #[case] vector: u32,
        #[case] link: u32,
    ) {
        let mut state = user_state();
        let before = state.regs.cpsr();
        assert!(interrupt_exception(&mut state, kind));
        assert_eq!(state.mode(), Some(mode));
        assert_eq!(state.pc(), vector);
        assert_eq!(state.regs.read(LR), link);
        assert_eq!(state.regs.spsr(), Some(before));
        assert!(state.regs.cpsr().irq_disabled());
        assert_eq!(state.regs.banked(ModeClass::User, LR), 0);
        assert_eq!(state.diag.exception_count(kind), 1);
    }

    #[test]
    fn masked_irq_changes_nothing() {
        let mut state = user_state();
        state.regs.cpsr_mut().set_irq_disabled(true);
        let regs = state.regs.clone();
        assert!(!interrupt_exception(&mut state, ExceptionKind::Irq));
        assert_eq!(state.regs, regs);
        assert_eq!(state.diag.exception_count(ExceptionKind::Irq), 0);
    }

    #[test]
    fn high_vectors_relocate_the_table() {
        let mut state = user_state();
        state.mmu.write_register(reg::CONTROL, 0, 0, CONTROL_V);
        interrupt_exception(&mut state, ExceptionKind::SoftwareInterrupt);
        assert_eq!(state.pc(), 0xFFFF_0008);
    }

    #[test]
    fn vector_order_matches_index() {
        for (index, kind) in ExceptionKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), index);
        }
    }
}
