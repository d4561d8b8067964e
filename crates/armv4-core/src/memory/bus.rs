//! System bus: MMU translation followed by RAM or peripheral dispatch.
//!
//! After translation the instruction counter is matched first, then RAM,
//! then the peripheral table in registration order. A physical address
//! nobody claims is fatal.

use crate::api::CpuState;
use crate::fault::CoreError;
use crate::memory::{read_ram, write_ram, AccessWidth, INSTRUCTION_COUNTER_ADDR};
use crate::mmu::Access;
use crate::peripherals::PeripheralTable;

impl CpuState {
    fn translate(&mut self, vaddr: u32, access: Access) -> Result<u32, CoreError> {
        let memory = &self.memory;
        self.mmu.translate(vaddr, access, |addr| {
            read_ram(memory, addr, AccessWidth::Word).ok_or(CoreError::UnmappedAddress { addr })
        })
    }

    /// Reads physical memory.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnmappedAddress`] when nothing claims `paddr`.
    pub fn physical_read(
        &mut self,
        devices: &mut PeripheralTable,
        paddr: u32,
        width: AccessWidth,
    ) -> Result<u32, CoreError> {
        if paddr == INSTRUCTION_COUNTER_ADDR {
            return Ok(self.instruction_counter & width.value_mask());
        }
        if let Some(value) = read_ram(&self.memory, paddr, width) {
            return Ok(value);
        }
        devices
            .read(paddr, width)
            .ok_or(CoreError::UnmappedAddress { addr: paddr })
    }

    /// Writes physical memory. Writes to the instruction counter are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnmappedAddress`] when nothing claims `paddr`.
    pub fn physical_write(
        &mut self,
        devices: &mut PeripheralTable,
        paddr: u32,
        value: u32,
        width: AccessWidth,
    ) -> Result<(), CoreError> {
        if paddr == INSTRUCTION_COUNTER_ADDR {
            return Ok(());
        }
        if write_ram(&mut self.memory, paddr, value & width.value_mask(), width)
            || devices.write(paddr, value, width)
        {
            Ok(())
        } else {
            Err(CoreError::UnmappedAddress { addr: paddr })
        }
    }

    /// Data read through the data-side TLB, or physical when `translate` is clear.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Abort`] for MMU faults and a fatal error for
    /// unmapped physical addresses.
    pub fn read(
        &mut self,
        devices: &mut PeripheralTable,
        privileged: bool,
        vaddr: u32,
        translate: bool,
        width: AccessWidth,
    ) -> Result<u32, CoreError> {
        let paddr = if translate {
            self.translate(vaddr, Access::data(false, privileged, width))?
        } else {
            vaddr
        };
        self.physical_read(devices, paddr, width)
    }

    /// Data write through the data-side TLB.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Abort`] for MMU faults and a fatal error for
    /// unmapped physical addresses.
    pub fn write(
        &mut self,
        devices: &mut PeripheralTable,
        privileged: bool,
        vaddr: u32,
        value: u32,
        width: AccessWidth,
    ) -> Result<(), CoreError> {
        let paddr = self.translate(vaddr, Access::data(true, privileged, width))?;
        self.physical_write(devices, paddr, value, width)
    }

    /// Instruction fetch through the instruction-side TLB.
    ///
    /// # Errors
    ///
    /// Same as [`CpuState::read`].
    pub fn fetch(&mut self, devices: &mut PeripheralTable, vaddr: u32) -> Result<u32, CoreError> {
        let privileged = self.regs.cpsr().privileged();
        let paddr = self.translate(vaddr, Access::fetch(privileged))?;
        self.physical_read(devices, paddr, AccessWidth::Word)
    }

    /// Copies a flat image into RAM at physical `base`, one word at a time.
    /// Returns the number of bytes loaded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ImageOutOfRange`] when the image does not fit.
    pub fn load_image(&mut self, base: u32, image: &[u8]) -> Result<usize, CoreError> {
        let out_of_range = CoreError::ImageOutOfRange {
            base,
            len: image.len(),
        };
        let end = (base as usize)
            .checked_add(image.len())
            .ok_or(out_of_range)?;
        if end > self.memory.len() {
            return Err(out_of_range);
        }

        let mut addr = base;
        for chunk in image.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            if chunk.len() == 4 && addr & 3 == 0 {
                if !write_ram(
                    &mut self.memory,
                    addr,
                    u32::from_le_bytes(word),
                    AccessWidth::Word,
                ) {
                    return Err(out_of_range);
                }
            } else {
                let mut target = addr;
                for byte in chunk {
                    if !write_ram(&mut self.memory, target, u32::from(*byte), AccessWidth::Byte) {
                        return Err(out_of_range);
                    }
                    target = target.wrapping_add(1);
                }
            }
            addr = addr.wrapping_add(4);
        }
        Ok(image.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{INTC_BASE, UART_BASE};
    use crate::mmu::{reg, CONTROL_A, CONTROL_M};
    use crate::CoreConfig;

    fn machine() -> (CpuState, PeripheralTable) {
        let mut devices = PeripheralTable::with_standard_devices(100);
        devices.reset_all();
        (CpuState::with_config(&CoreConfig::bare_metal()), devices)
    }

    #[test]
    fn ram_roundtrip_through_bus() {
        let (mut cpu, mut devices) = machine();
        cpu.write(&mut devices, true, 0x100, 0xCAFE_F00D, AccessWidth::Word)
            .expect("ram write");
        assert_eq!(
            cpu.read(&mut devices, true, 0x102, true, AccessWidth::Halfword),
            Ok(0xCAFE)
        );
        assert_eq!(
            cpu.read(&mut devices, true, 0x100, false, AccessWidth::Byte),
            Ok(0x0D)
        );
    }

    #[test]
    fn instruction_counter_is_read_only() {
        let (mut cpu, mut devices) = machine();
        cpu.instruction_counter = 42;
        cpu.write(&mut devices, true, INSTRUCTION_COUNTER_ADDR, 7, AccessWidth::Word)
            .expect("ignored write");
        assert_eq!(
            cpu.read(&mut devices, true, INSTRUCTION_COUNTER_ADDR, true, AccessWidth::Word),
            Ok(42)
        );
    }

    #[test]
    fn devices_receive_masked_writes() {
        let (mut cpu, mut devices) = machine();
        cpu.write(&mut devices, true, INTC_BASE, 0x1234_5678, AccessWidth::Byte)
            .expect("intc write");
        assert_eq!(
            cpu.read(&mut devices, true, INTC_BASE, true, AccessWidth::Word),
            Ok(0x78)
        );
        cpu.write(&mut devices, true, UART_BASE, u32::from(b'A'), AccessWidth::Byte)
            .expect("uart write");
        let uart = devices
            .device_mut::<crate::peripherals::Uart>()
            .expect("uart");
        assert_eq!(uart.take_output(), b"A");
    }

    #[test]
    fn unmapped_physical_address_is_fatal() {
        let (mut cpu, mut devices) = machine();
        let result = cpu.read(&mut devices, true, 0x0500_0000, true, AccessWidth::Word);
        assert_eq!(result, Err(CoreError::UnmappedAddress { addr: 0x0500_0000 }));
        assert!(result.err().is_some_and(CoreError::is_fatal));
    }

    #[test]
    fn alignment_fault_leaves_memory_untouched() {
        let (mut cpu, mut devices) = machine();
        cpu.mmu = crate::mmu::Mmu::default();
        cpu.mmu.write_register(reg::CONTROL, 0, 0, CONTROL_M | CONTROL_A);
        let result = cpu.write(&mut devices, true, 0x201, 0xFFFF_FFFF, AccessWidth::Word);
        assert!(matches!(result, Err(CoreError::Abort(_))));
        assert!(cpu.memory[0x200..0x204].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn image_loading_is_bounds_checked() {
        let (mut cpu, _) = machine();
        assert_eq!(cpu.load_image(0x8000, &[1, 2, 3, 4, 5]), Ok(5));
        assert_eq!(&cpu.memory[0x8000..0x8005], &[1, 2, 3, 4, 5]);
        let len = cpu.memory.len();
        assert!(matches!(
            cpu.load_image(u32::try_from(len).expect("ram size") - 2, &[0; 4]),
            Err(CoreError::ImageOutOfRange { .. })
        ));
    }
}
