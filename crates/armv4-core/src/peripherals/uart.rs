use std::any::Any;
use std::collections::VecDeque;

use super::{Peripheral, PeripheralError, IRQ_UART};
use crate::memory::AccessWidth;

/// Receive buffer (read) / transmit holding (write) / divisor latch low.
pub const REG_RBR: u32 = 0;
/// Interrupt enable / divisor latch high.
pub const REG_IER: u32 = 1;
/// Interrupt identification (read) / FIFO control (write).
pub const REG_IIR: u32 = 2;
/// Line control.
pub const REG_LCR: u32 = 3;
/// Modem control.
pub const REG_MCR: u32 = 4;
/// Line status.
pub const REG_LSR: u32 = 5;
/// Modem status.
pub const REG_MSR: u32 = 6;
/// Scratch.
pub const REG_SCR: u32 = 7;

/// LCR bit selecting the divisor latches.
pub const LCR_DLAB: u8 = 0x80;
/// LSR: receive data ready.
pub const LSR_DR: u8 = 0x01;
/// LSR: transmit holding register empty.
pub const LSR_THRE: u8 = 0x20;
/// LSR: transmitter empty.
pub const LSR_TEMT: u8 = 0x40;

const IER_RX_AVAILABLE: u8 = 0x01;
const IER_THR_EMPTY: u8 = 0x02;

const IIR_NONE: u8 = 0x01;
const IIR_THR_EMPTY: u8 = 0x02;
const IIR_RX_AVAILABLE: u8 = 0x04;
const IIR_FIFO_ENABLED: u8 = 0xC0;

const FCR_FIFO_ENABLE: u8 = 0x01;
const FCR_CLEAR_RX: u8 = 0x02;
const FCR_CLEAR_TX: u8 = 0x04;

// Carrier detect, data set ready, clear to send.
const MSR_CONNECTED: u8 = 0xB0;

/// 16550-compatible UART with byte registers at a 4-byte stride.
///
/// Transmission completes instantly: written bytes queue up for the host,
/// which drains them with [`Uart::take_output`]. Input arrives through
/// [`Uart::push_input`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uart {
    rx: VecDeque<u8>,
    tx: VecDeque<u8>,
    ier: u8,
    lcr: u8,
    mcr: u8,
    fcr: u8,
    scr: u8,
    dll: u8,
    dlm: u8,
    thre_pending: bool,
}

impl Uart {
    /// Queues bytes for the guest to receive.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Removes and returns everything the guest transmitted.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.tx.drain(..).collect()
    }

    /// Baud-rate divisor programmed through the latches.
    #[must_use]
    pub const fn divisor(&self) -> u16 {
        u16::from_le_bytes([self.dll, self.dlm])
    }

    const fn dlab(&self) -> bool {
        self.lcr & LCR_DLAB != 0
    }

    fn interrupt_id(&self) -> u8 {
        let fifo = if self.fcr & FCR_FIFO_ENABLE != 0 {
            IIR_FIFO_ENABLED
        } else {
            0
        };
        let id = if self.ier & IER_RX_AVAILABLE != 0 && !self.rx.is_empty() {
            IIR_RX_AVAILABLE
        } else if self.ier & IER_THR_EMPTY != 0 && self.thre_pending {
            IIR_THR_EMPTY
        } else {
            IIR_NONE
        };
        fifo | id
    }

    fn line_status(&self) -> u8 {
        let ready = if self.rx.is_empty() { 0 } else { LSR_DR };
        ready | LSR_THRE | LSR_TEMT
    }
}

impl Peripheral for Uart {
    fn name(&self) -> &'static str {
        "uart"
    }

    fn reset(&mut self) -> Result<(), PeripheralError> {
        let rx = std::mem::take(&mut self.rx);
        *self = Self::default();
        self.rx = rx;
        Ok(())
    }

    fn read(&mut self, offset: u32) -> u32 {
        let value = match offset >> 2 {
            REG_RBR if self.dlab() => self.dll,
            REG_RBR => self.rx.pop_front().unwrap_or(0),
            REG_IER if self.dlab() => self.dlm,
            REG_IER => self.ier,
            REG_IIR => {
                let id = self.interrupt_id();
                if id & 0x0F == IIR_THR_EMPTY {
                    self.thre_pending = false;
                }
                id
            }
            REG_LCR => self.lcr,
            REG_MCR => self.mcr,
            REG_LSR => self.line_status(),
            REG_MSR => MSR_CONNECTED,
            REG_SCR => self.scr,
            _ => 0,
        };
        u32::from(value)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write(&mut self, offset: u32, value: u32, _width: AccessWidth) {
        let byte = value as u8;
        match offset >> 2 {
            REG_RBR if self.dlab() => self.dll = byte,
            REG_RBR => {
                self.tx.push_back(byte);
                self.thre_pending = true;
            }
            REG_IER if self.dlab() => self.dlm = byte,
            REG_IER => {
                self.ier = byte & 0x0F;
                if self.ier & IER_THR_EMPTY != 0 {
                    self.thre_pending = true;
                }
            }
            REG_IIR => {
                self.fcr = byte;
                if byte & FCR_CLEAR_RX != 0 {
                    self.rx.clear();
                }
                if byte & FCR_CLEAR_TX != 0 {
                    self.tx.clear();
                }
            }
            REG_LCR => self.lcr = byte,
            REG_MCR => self.mcr = byte & 0x1F,
            REG_SCR => self.scr = byte,
            _ => {}
        }
    }

    fn tick(&mut self) -> u32 {
        if self.interrupt_id() & 0x0F == IIR_NONE {
            0
        } else {
            IRQ_UART
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
