//! Public host-facing API for embedding the core.

use crate::decoder::DecoderState;
use crate::diag::DiagCounters;
use crate::execute::{interrupt_exception, ExceptionKind};
use crate::memory::{new_ram, BARE_METAL_RAM_BYTES, DEFAULT_RAM_BYTES, MAX_RAM_BYTES};
use crate::mmu::Mmu;
use crate::state::{Mode, RegisterFile, RunState};
use crate::CoreError;

/// Core execution profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CoreProfile {
    /// Full system: MMU, TLBs and all processor modes.
    #[default]
    Mmu,
    /// Reference bare-metal machine: translation can never be enabled.
    BareMetal,
}

/// Top-level configuration for a core instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoreConfig {
    /// Profile selection.
    pub profile: CoreProfile,
    /// RAM size in bytes, mapped at physical address zero.
    pub memory_bytes: usize,
    /// Emits one `trace` log record per executed instruction.
    pub trace_instructions: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            profile: CoreProfile::Mmu,
            memory_bytes: DEFAULT_RAM_BYTES,
            trace_instructions: false,
        }
    }
}

impl CoreConfig {
    /// Configuration of the bare-metal reference machine.
    #[must_use]
    pub fn bare_metal() -> Self {
        Self {
            profile: CoreProfile::BareMetal,
            memory_bytes: BARE_METAL_RAM_BYTES,
            ..Self::default()
        }
    }

    /// Checks that RAM ends below the first device window.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RamTooLarge`] when `memory_bytes` exceeds
    /// [`MAX_RAM_BYTES`].
    pub const fn validate(&self) -> Result<(), CoreError> {
        if self.memory_bytes > MAX_RAM_BYTES {
            return Err(CoreError::RamTooLarge {
                bytes: self.memory_bytes,
                limit: MAX_RAM_BYTES,
            });
        }
        Ok(())
    }
}

/// Result of a single [`crate::step_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Instruction executed.
    Retired {
        /// Approximate cost of the instruction.
        cycles: u8,
    },
    /// Condition check failed; only the PC advanced.
    Skipped,
    /// An exception was entered at the end of the step.
    Exception {
        /// The exception taken last.
        kind: ExceptionKind,
    },
    /// Core is halted; nothing was executed.
    Halted(CoreError),
}

/// All architectural state of one CPU.
#[derive(Debug, Clone)]
pub struct CpuState {
    /// Banked registers and status words.
    pub regs: RegisterFile,
    /// CP15, MMU and TLBs.
    pub mmu: Mmu,
    /// Physical RAM.
    pub memory: Box<[u8]>,
    /// Decode-stage state of the current step.
    pub decoder: DecoderState,
    /// Executed instructions, visible on the bus.
    pub instruction_counter: u32,
    /// Current execution state.
    pub run_state: RunState,
    /// Exception and abort counters.
    pub diag: DiagCounters,
}

impl Default for CpuState {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl CpuState {
    /// Creates a core in its reset state.
    ///
    /// RAM larger than [`MAX_RAM_BYTES`] is clamped so the device windows stay
    /// reachable; use [`CpuState::try_with_config`] to reject it instead.
    #[must_use]
    pub fn with_config(config: &CoreConfig) -> Self {
        if let Err(error) = config.validate() {
            log::warn!("{error}; clamping RAM to {MAX_RAM_BYTES:#x} bytes");
        }
        let mut state = Self {
            regs: RegisterFile::default(),
            mmu: Mmu::new(config.profile == CoreProfile::Mmu),
            memory: new_ram(config.memory_bytes.min(MAX_RAM_BYTES)),
            decoder: DecoderState::default(),
            instruction_counter: 0,
            run_state: RunState::Running,
            diag: DiagCounters::default(),
        };
        state.reset();
        state
    }

    /// Creates a core after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RamTooLarge`] when RAM would cover the devices.
    pub fn try_with_config(config: &CoreConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Applies reset: MMU off, SVC mode with IRQ and FIQ masked, PC at the
    /// reset vector. RAM contents are kept.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::default();
        self.mmu.reset();
        self.decoder = DecoderState::default();
        self.instruction_counter = 0;
        self.run_state = RunState::Running;
        interrupt_exception(self, ExceptionKind::Reset);
    }

    /// Current processor mode, `None` for a reserved encoding.
    #[must_use]
    pub const fn mode(&self) -> Option<Mode> {
        self.regs.cpsr().mode()
    }

    /// Address of the next instruction to fetch.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.regs.pc()
    }

    /// Whether a fatal error stopped the core.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self.run_state, RunState::Halted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ModeClass;

    #[test]
    fn reset_enters_svc_with_interrupts_masked() {
        let state = CpuState::default();
        assert_eq!(state.mode(), Some(Mode::Svc));
        assert!(state.regs.cpsr().irq_disabled());
        assert!(state.regs.cpsr().fiq_disabled());
        assert_eq!(state.pc(), 0);
        assert!(!state.mmu.enabled());
        assert_eq!(state.memory.len(), DEFAULT_RAM_BYTES);
    }

    #[test]
    fn bare_metal_profile_uses_small_ram() {
        let state = CpuState::with_config(&CoreConfig::bare_metal());
        assert_eq!(state.memory.len(), BARE_METAL_RAM_BYTES);
    }

    #[test]
    fn ram_reaching_device_windows_is_rejected() {
        let config = CoreConfig {
            memory_bytes: 64 * 1024 * 1024,
            ..CoreConfig::default()
        };
        assert_eq!(
            CpuState::try_with_config(&config).err(),
            Some(CoreError::RamTooLarge {
                bytes: 64 * 1024 * 1024,
                limit: MAX_RAM_BYTES,
            })
        );
        assert!(CpuState::try_with_config(&CoreConfig::default()).is_ok());
    }

    #[test]
    fn oversized_ram_is_clamped_and_uart_stays_reachable() {
        use crate::memory::{AccessWidth, UART_BASE};
        use crate::peripherals::{PeripheralTable, Uart};

        let config = CoreConfig {
            memory_bytes: 64 * 1024 * 1024,
            ..CoreConfig::default()
        };
        let mut state = CpuState::with_config(&config);
        assert_eq!(state.memory.len(), MAX_RAM_BYTES);

        let mut devices = PeripheralTable::with_standard_devices(100);
        devices.reset_all();
        state
            .write(&mut devices, true, UART_BASE, u32::from(b'Z'), AccessWidth::Byte)
            .expect("uart write");
        let uart = devices.device_mut::<Uart>().expect("uart registered");
        assert_eq!(uart.take_output(), b"Z");
    }

    #[test]
    fn reset_keeps_ram_and_clears_registers() {
        let mut state = CpuState::with_config(&CoreConfig::bare_metal());
        state.memory[0x100] = 0xAB;
        state.regs.write(3, 7);
        state.regs.set_banked(ModeClass::Irq, 13, 0x9000);
        state.reset();
        assert_eq!(state.memory[0x100], 0xAB);
        assert_eq!(state.regs.read(3), 0);
        assert_eq!(state.regs.banked(ModeClass::Irq, 13), 0);
    }
}
