//! Peripheral port and the reference devices of the standard machine.
//!
//! The bus owns no devices. The host builds a [`PeripheralTable`], resets it
//! once and lends it to the core for every step. An entry whose reset fails
//! is disabled for the rest of the run.

/// Interrupt controller.
pub mod intc;
/// Periodic countdown timer.
pub mod timer;
/// 16550-style UART.
pub mod uart;

use std::any::Any;

use thiserror::Error;

use crate::memory::{
    AccessWidth, RegionDescriptor, INTC_BASE, INTC_MASK, TIMER_BASE, TIMER_MASK, UART_BASE,
    UART_MASK,
};

pub use intc::InterruptController;
pub use timer::Timer;
pub use uart::Uart;

/// Interrupt line raised by the timer.
pub const IRQ_TIMER: u32 = 1 << 0;
/// Interrupt line raised by the UART.
pub const IRQ_UART: u32 = 1 << 1;

/// Errors reported by peripheral callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeripheralError {
    /// Device could not be brought to its reset state.
    #[error("{device}: reset failed: {reason}")]
    ResetFailed {
        /// Device name.
        device: &'static str,
        /// Human-readable cause.
        reason: String,
    },
}

/// A memory-mapped device.
///
/// `read` and `write` receive the offset of the access inside the device
/// window. Reads are masked to the access width by the bus; writes receive the
/// value already masked.
pub trait Peripheral: Any {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Brings the device to its reset state.
    ///
    /// # Errors
    ///
    /// Returns [`PeripheralError`] when the device cannot operate; the bus then
    /// disables its entry.
    fn reset(&mut self) -> Result<(), PeripheralError>;

    /// Reads the register at `offset`.
    fn read(&mut self, offset: u32) -> u32;

    /// Writes the register at `offset`.
    fn write(&mut self, offset: u32, value: u32, width: AccessWidth);

    /// Advances device time by one poll; returns interrupt lines to raise.
    fn tick(&mut self) -> u32 {
        0
    }

    /// Receives interrupt lines raised by any device during a poll.
    fn raise_lines(&mut self, _lines: u32) {}

    /// Whether this device drives the CPU IRQ input.
    fn irq_asserted(&self) -> bool {
        false
    }

    /// Downcasting support for host access to concrete devices.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct PeripheralEntry {
    region: RegionDescriptor,
    device: Box<dyn Peripheral>,
    enabled: bool,
}

/// Ordered peripheral decode table.
#[derive(Default)]
pub struct PeripheralTable {
    entries: Vec<PeripheralEntry>,
}

impl std::fmt::Debug for PeripheralTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.region.name, entry.region.prefix, entry.enabled)),
            )
            .finish()
    }
}

impl PeripheralTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt controller, timer and UART at their fixed addresses.
    #[must_use]
    pub fn with_standard_devices(timer_interval: u32) -> Self {
        let mut table = Self::new();
        table.register(INTC_MASK, INTC_BASE, Box::new(InterruptController::default()));
        table.register(TIMER_MASK, TIMER_BASE, Box::new(Timer::new(timer_interval)));
        table.register(UART_MASK, UART_BASE, Box::new(Uart::default()));
        table
    }

    /// Appends a device claiming addresses where `addr & mask == prefix`.
    pub fn register(&mut self, mask: u32, prefix: u32, device: Box<dyn Peripheral>) {
        self.entries.push(PeripheralEntry {
            region: RegionDescriptor {
                name: device.name(),
                mask,
                prefix,
            },
            device,
            enabled: true,
        });
    }

    /// Resets every enabled entry, permanently disabling those that fail.
    /// Returns the number of entries left enabled.
    pub fn reset_all(&mut self) -> usize {
        for entry in self.entries.iter_mut().filter(|entry| entry.enabled) {
            if let Err(error) = entry.device.reset() {
                log::warn!("peripheral disabled: {error}");
                entry.enabled = false;
            }
        }
        self.entries.iter().filter(|entry| entry.enabled).count()
    }

    fn claim(&mut self, addr: u32) -> Option<(&mut (dyn Peripheral + 'static), u32)> {
        self.entries
            .iter_mut()
            .find(|entry| entry.enabled && entry.region.contains(addr))
            .map(|entry| (entry.device.as_mut(), entry.region.offset(addr)))
    }

    /// Reads from the first device claiming `addr`, `None` when unclaimed.
    pub fn read(&mut self, addr: u32, width: AccessWidth) -> Option<u32> {
        let (device, offset) = self.claim(addr)?;
        Some(device.read(offset) & width.value_mask())
    }

    /// Writes to the first device claiming `addr`; `false` when unclaimed.
    pub fn write(&mut self, addr: u32, value: u32, width: AccessWidth) -> bool {
        match self.claim(addr) {
            Some((device, offset)) => {
                device.write(offset, value & width.value_mask(), width);
                true
            }
            None => false,
        }
    }

    /// Ticks every enabled device and routes the lines they raise.
    pub fn poll(&mut self) {
        let lines = self
            .entries
            .iter_mut()
            .filter(|entry| entry.enabled)
            .fold(0, |lines, entry| lines | entry.device.tick());
        if lines != 0 {
            for entry in self.entries.iter_mut().filter(|entry| entry.enabled) {
                entry.device.raise_lines(lines);
            }
        }
    }

    /// Whether any enabled device asserts IRQ.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.enabled && entry.device.irq_asserted())
    }

    /// First device of concrete type `T`.
    pub fn device_mut<T: Peripheral>(&mut self) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find_map(|entry| entry.device.as_any_mut().downcast_mut::<T>())
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
