use super::mode::{mode_class, ModeClass, MODE_CLASS_COUNT};
use super::psr::StatusWord;

/// Number of architecturally visible registers per mode (`r0..r15`).
pub const REGISTER_COUNT: usize = 16;
/// Program counter register id.
pub const PC: usize = 15;
/// Link register id.
pub const LR: usize = 14;
/// Stack pointer register id.
pub const SP: usize = 13;

/// Banked register storage and status words.
///
/// Each mode class owns a full bank of sixteen slots, but only a subset is
/// ever selected for it: r0-r7 and r15 always resolve to the user bank, r8-r12
/// resolve to the FIQ bank while in FIQ mode, and r13/r14 resolve to the bank
/// of the current class unless that class is user.
///
/// Status slot 0 holds CPSR. Slot `n` for `n > 0` is the SPSR of class `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    banks: [[u32; REGISTER_COUNT]; MODE_CLASS_COUNT],
    status: [StatusWord; MODE_CLASS_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            banks: [[0; REGISTER_COUNT]; MODE_CLASS_COUNT],
            status: [StatusWord::new(crate::state::Mode::Svc.bits()); MODE_CLASS_COUNT],
        }
    }
}

impl RegisterFile {
    /// Class selected by the current CPSR.
    #[must_use]
    pub const fn class(&self) -> ModeClass {
        mode_class(self.status[0])
    }

    const fn bank_for(&self, id: usize) -> usize {
        match id {
            8..=12 if matches!(self.class(), ModeClass::Fiq) => ModeClass::Fiq.index(),
            13 | 14 => self.class().index(),
            _ => ModeClass::User.index(),
        }
    }

    /// Reads register `id` as an instruction operand.
    ///
    /// r15 reads as the stored PC plus 4, i.e. the executing instruction's
    /// address plus 8.
    #[must_use]
    pub const fn read(&self, id: usize) -> u32 {
        let id = id & 0xF;
        let value = self.banks[self.bank_for(id)][id];
        if id == PC {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    /// Writes register `id` in the current mode. r15 is written as-is.
    pub const fn write(&mut self, id: usize, value: u32) {
        let id = id & 0xF;
        let bank = self.bank_for(id);
        self.banks[bank][id] = value;
    }

    /// Reads register `id` from the user bank regardless of mode.
    #[must_use]
    pub const fn read_user(&self, id: usize) -> u32 {
        let id = id & 0xF;
        let value = self.banks[ModeClass::User.index()][id];
        if id == PC {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    /// Writes register `id` in the user bank regardless of mode.
    pub const fn write_user(&mut self, id: usize, value: u32) {
        self.banks[ModeClass::User.index()][id & 0xF] = value;
    }

    /// Raw stored PC: the address of the next fetch.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.banks[ModeClass::User.index()][PC]
    }

    /// Sets the raw stored PC.
    pub const fn set_pc(&mut self, value: u32) {
        self.banks[ModeClass::User.index()][PC] = value;
    }

    /// Reads a register directly from a chosen bank.
    #[must_use]
    pub const fn banked(&self, class: ModeClass, id: usize) -> u32 {
        self.banks[class.index()][id & 0xF]
    }

    /// Writes a register directly into a chosen bank.
    pub const fn set_banked(&mut self, class: ModeClass, id: usize, value: u32) {
        self.banks[class.index()][id & 0xF] = value;
    }

    /// Current program status word.
    #[must_use]
    pub const fn cpsr(&self) -> StatusWord {
        self.status[0]
    }

    /// Mutable access to CPSR for flag updates.
    pub const fn cpsr_mut(&mut self) -> &mut StatusWord {
        &mut self.status[0]
    }

    /// Replaces CPSR; bank selection follows the new mode bits.
    pub const fn set_cpsr(&mut self, value: StatusWord) {
        self.status[0] = value;
    }

    /// SPSR of the current mode, `None` when the mode has none.
    #[must_use]
    pub const fn spsr(&self) -> Option<StatusWord> {
        match self.class() {
            ModeClass::User => None,
            class => Some(self.status[class.index()]),
        }
    }

    /// Writes the SPSR of the current mode. Ignored when it has none.
    pub const fn set_spsr(&mut self, value: StatusWord) {
        match self.class() {
            ModeClass::User => {}
            class => self.status[class.index()] = value,
        }
    }

    /// SPSR slot of an explicit class.
    #[must_use]
    pub const fn spsr_of(&self, class: ModeClass) -> Option<StatusWord> {
        match class {
            ModeClass::User => None,
            class => Some(self.status[class.index()]),
        }
    }

    /// Writes the SPSR slot of an explicit class. Ignored for user.
    pub const fn set_spsr_of(&mut self, class: ModeClass, value: StatusWord) {
        match class {
            ModeClass::User => {}
            class => self.status[class.index()] = value,
        }
    }
}
