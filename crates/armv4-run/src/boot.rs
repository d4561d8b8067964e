//! Machine assembly and the two boot protocols.

use anyhow::{anyhow, bail, Context, Result};
use armv4_core::peripherals::Uart;
use armv4_core::{step_one, CpuState, PeripheralTable, RegisterDump, StepOutcome};

use crate::config::RunnerConfig;

/// `B .` with the condition always.
const BRANCH_TO_SELF: u32 = 0xEAFF_FFFE;
/// Machine type passed in r1; all ones selects device-tree boot.
const LINUX_MACHINE_DT: u32 = 0xFFFF_FFFF;

/// A core plus its devices.
pub struct Machine {
    /// CPU state.
    pub cpu: CpuState,
    /// Standard device set.
    pub devices: PeripheralTable,
    config: RunnerConfig,
}

impl Machine {
    /// Builds and resets a machine for `config`.
    pub fn new(config: &RunnerConfig) -> Self {
        let cpu = CpuState::with_config(&config.core);
        let mut devices = PeripheralTable::with_standard_devices(config.timer_interval);
        let total = devices.len();
        let enabled = devices.reset_all();
        if enabled < total {
            log::warn!("{} of {total} peripherals disabled at reset", total - enabled);
        }
        Self {
            cpu,
            devices,
            config: config.clone(),
        }
    }

    /// Loads a flat image at `base` and starts at `entry`, or `base` when absent.
    pub fn boot_bin(&mut self, image: &[u8], base: u32, entry: Option<u32>) -> Result<()> {
        let loaded = self
            .cpu
            .load_image(base, image)
            .context("failed to load image")?;
        let entry = entry.unwrap_or(base);
        self.cpu.regs.set_pc(entry);
        log::info!("loaded {loaded} bytes at {base:#010x}, entry {entry:#010x}");
        Ok(())
    }

    /// Loads a kernel and device tree and sets up the ARM Linux boot registers.
    ///
    /// The core stays in SVC with IRQ and FIQ masked and the MMU off, as left
    /// by reset.
    pub fn boot_linux(&mut self, kernel: &[u8], dtb: &[u8]) -> Result<()> {
        let kernel_base = self.config.kernel_offset;
        let dtb_base = self.config.dtb_address;
        let kernel_end = u64::from(kernel_base) + kernel.len() as u64;
        let dtb_end = u64::from(dtb_base) + dtb.len() as u64;
        if u64::from(kernel_base) < dtb_end && u64::from(dtb_base) < kernel_end {
            bail!(
                "kernel {kernel_base:#x}..{kernel_end:#x} overlaps device tree {dtb_base:#x}..{dtb_end:#x}"
            );
        }

        self.cpu
            .load_image(kernel_base, kernel)
            .context("failed to load kernel")?;
        self.cpu
            .load_image(dtb_base, dtb)
            .context("failed to load device tree")?;

        self.cpu.regs.write(0, 0);
        self.cpu.regs.write(1, LINUX_MACHINE_DT);
        self.cpu.regs.write(2, dtb_base);
        self.cpu.regs.set_pc(kernel_base);
        log::info!(
            "kernel at {kernel_base:#010x} ({} bytes), dtb at {dtb_base:#010x} ({} bytes)",
            kernel.len(),
            dtb.len()
        );
        Ok(())
    }

    /// Runs one instruction and one device poll.
    ///
    /// A host-fatal error comes back with the register dump attached.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let outcome = step_one(&mut self.cpu, &mut self.devices, &self.config.core).map_err(|error| {
            anyhow!(error).context(format!(
                "core halted\n{}",
                RegisterDump::capture(&self.cpu)
            ))
        })?;
        self.devices.poll();
        Ok(outcome)
    }

    /// Bytes the guest wrote to the UART since the last call.
    pub fn take_console(&mut self) -> Vec<u8> {
        self.devices
            .device_mut::<Uart>()
            .map(Uart::take_output)
            .unwrap_or_default()
    }

    /// The last instruction was `B .` with IRQs masked; nothing can change.
    pub fn is_parked(&self) -> bool {
        self.cpu.decoder.shape.is_some()
            && self.cpu.decoder.word == BRANCH_TO_SELF
            && self.cpu.regs.cpsr().irq_disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armv4_core::{CoreConfig, CoreProfile, Mode};

    fn words(program: &[u32]) -> Vec<u8> {
        program.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    fn bare() -> RunnerConfig {
        RunnerConfig {
            core: CoreConfig::bare_metal(),
            ..RunnerConfig::default()
        }
    }

    #[test]
    fn bin_boot_runs_until_parked() {
        let mut machine = Machine::new(&bare());
        machine
            .boot_bin(&words(&[0xE3A0_0005, 0xE280_0003, BRANCH_TO_SELF]), 0, None)
            .unwrap();
        for _ in 0..3 {
            machine.step().unwrap();
        }
        assert!(machine.is_parked());
        assert_eq!(machine.cpu.regs.read(0), 8);
    }

    #[test]
    fn bin_boot_honours_entry() {
        let mut machine = Machine::new(&bare());
        machine.boot_bin(&[0; 16], 0x100, Some(0x108)).unwrap();
        assert_eq!(machine.cpu.pc(), 0x108);
    }

    #[test]
    fn image_past_ram_is_rejected() {
        let mut machine = Machine::new(&bare());
        assert!(machine.boot_bin(&[0; 8], 0x000F_FFFC, None).is_err());
    }

    #[test]
    fn linux_boot_sets_protocol_registers() {
        let config = RunnerConfig::default();
        assert_eq!(config.core.profile, CoreProfile::Mmu);
        let mut machine = Machine::new(&config);
        machine.boot_linux(&[0xAA; 64], &[0xD0, 0x0D, 0xFE, 0xED]).unwrap();

        assert_eq!(machine.cpu.regs.read(0), 0);
        assert_eq!(machine.cpu.regs.read(1), 0xFFFF_FFFF);
        assert_eq!(machine.cpu.regs.read(2), config.dtb_address);
        assert_eq!(machine.cpu.pc(), config.kernel_offset);
        assert_eq!(machine.cpu.mode(), Some(Mode::Svc));
        assert!(machine.cpu.regs.cpsr().irq_disabled());
        assert!(machine.cpu.regs.cpsr().fiq_disabled());
        assert!(!machine.cpu.mmu.enabled());
        let dtb = config.dtb_address as usize;
        assert_eq!(&machine.cpu.memory[dtb..dtb + 4], &[0xD0, 0x0D, 0xFE, 0xED]);
    }

    #[test]
    fn overlapping_dtb_is_rejected() {
        let config = RunnerConfig {
            dtb_address: 0x8010,
            ..RunnerConfig::default()
        };
        let mut machine = Machine::new(&config);
        let error = machine.boot_linux(&[0; 64], &[0; 4]).unwrap_err();
        assert!(error.to_string().contains("overlaps"));
    }

    #[test]
    fn fatal_step_carries_register_dump() {
        let mut machine = Machine::new(&bare());
        machine.boot_bin(&words(&[0xE1C1_00D0]), 0, None).unwrap();
        let error = machine.step().unwrap_err();
        let text = format!("{error:#}");
        assert!(text.contains("core halted"));
        assert!(text.contains("r15"));
    }

    #[test]
    fn console_collects_uart_bytes() {
        let mut machine = Machine::new(&bare());
        machine
            .boot_bin(
                &words(&[0xE3A0_1403, 0xE381_1801, 0xE3A0_0041, 0xE5C1_0000]),
                0,
                None,
            )
            .unwrap();
        for _ in 0..4 {
            machine.step().unwrap();
        }
        assert_eq!(machine.take_console(), b"A");
        assert!(machine.take_console().is_empty());
    }
}
