use std::any::Any;

use super::{Peripheral, PeripheralError};
use crate::memory::AccessWidth;

/// Offset of the enable mask register.
pub const INTC_REG_MASK: u32 = 0x0;
/// Offset of the pending register (write one to clear).
pub const INTC_REG_PENDING: u32 = 0x4;

/// Latches device lines and drives IRQ while `pending & mask` is non-zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptController {
    mask: u32,
    pending: u32,
}

impl InterruptController {
    /// Latched lines.
    #[must_use]
    pub const fn pending(&self) -> u32 {
        self.pending
    }
}

impl Peripheral for InterruptController {
    fn name(&self) -> &'static str {
        "intc"
    }

    fn reset(&mut self) -> Result<(), PeripheralError> {
        *self = Self::default();
        Ok(())
    }

    fn read(&mut self, offset: u32) -> u32 {
        match offset & !0x3 {
            INTC_REG_MASK => self.mask,
            INTC_REG_PENDING => self.pending,
            _ => 0,
        }
    }

    fn write(&mut self, offset: u32, value: u32, _width: AccessWidth) {
        match offset & !0x3 {
            INTC_REG_MASK => self.mask = value,
            INTC_REG_PENDING => self.pending &= !value,
            _ => {}
        }
    }

    fn raise_lines(&mut self, lines: u32) {
        self.pending |= lines;
    }

    fn irq_asserted(&self) -> bool {
        self.pending & self.mask != 0
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
