use std::fmt;

use super::mode::Mode;

/// CPSR bit for negative result.
pub const PSR_N: u32 = 1 << 31;
/// CPSR bit for zero result.
pub const PSR_Z: u32 = 1 << 30;
/// CPSR bit for carry / not-borrow.
pub const PSR_C: u32 = 1 << 29;
/// CPSR bit for signed overflow.
pub const PSR_V: u32 = 1 << 28;
/// CPSR sticky overflow bit.
pub const PSR_Q: u32 = 1 << 27;
/// CPSR IRQ disable bit.
pub const PSR_I: u32 = 1 << 7;
/// CPSR FIQ disable bit.
pub const PSR_F: u32 = 1 << 6;
/// CPSR Thumb state bit.
pub const PSR_T: u32 = 1 << 5;
/// Mask of the mode field.
pub const PSR_MODE_MASK: u32 = 0x1F;
/// Mask of the four condition flags.
pub const PSR_FLAGS_MASK: u32 = PSR_N | PSR_Z | PSR_C | PSR_V;

/// A program status word (CPSR or SPSR).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusWord(u32);

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusWord")
            .field("raw", &format_args!("{:#010x}", self.0))
            .field("n", &self.negative())
            .field("z", &self.zero())
            .field("c", &self.carry())
            .field("v", &self.overflow())
            .field("i", &self.irq_disabled())
            .field("f", &self.fiq_disabled())
            .field("t", &self.thumb())
            .field("mode", &self.mode())
            .finish()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}{}{}{}{} {}",
            flag(self.negative(), 'N'),
            flag(self.zero(), 'Z'),
            flag(self.carry(), 'C'),
            flag(self.overflow(), 'V'),
            flag(self.irq_disabled(), 'I'),
            flag(self.fiq_disabled(), 'F'),
            flag(self.thumb(), 'T'),
            self.mode().map_or("???", Mode::name),
        )
    }
}

impl StatusWord {
    /// Wraps a raw status value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw 32-bit value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Replaces the raw value.
    pub const fn set_raw(&mut self, raw: u32) {
        self.0 = raw;
    }

    const fn bit(self, mask: u32) -> bool {
        self.0 & mask != 0
    }

    const fn set_bit(&mut self, mask: u32, set: bool) {
        if set {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// N flag.
    #[must_use]
    pub const fn negative(self) -> bool {
        self.bit(PSR_N)
    }

    /// Z flag.
    #[must_use]
    pub const fn zero(self) -> bool {
        self.bit(PSR_Z)
    }

    /// C flag.
    #[must_use]
    pub const fn carry(self) -> bool {
        self.bit(PSR_C)
    }

    /// V flag.
    #[must_use]
    pub const fn overflow(self) -> bool {
        self.bit(PSR_V)
    }

    /// Q flag.
    #[must_use]
    pub const fn sticky_overflow(self) -> bool {
        self.bit(PSR_Q)
    }

    /// I bit: IRQs masked.
    #[must_use]
    pub const fn irq_disabled(self) -> bool {
        self.bit(PSR_I)
    }

    /// F bit: FIQs masked.
    #[must_use]
    pub const fn fiq_disabled(self) -> bool {
        self.bit(PSR_F)
    }

    /// T bit: Thumb state.
    #[must_use]
    pub const fn thumb(self) -> bool {
        self.bit(PSR_T)
    }

    /// Sets the N flag.
    pub const fn set_negative(&mut self, set: bool) {
        self.set_bit(PSR_N, set);
    }

    /// Sets the Z flag.
    pub const fn set_zero(&mut self, set: bool) {
        self.set_bit(PSR_Z, set);
    }

    /// Sets the C flag.
    pub const fn set_carry(&mut self, set: bool) {
        self.set_bit(PSR_C, set);
    }

    /// Sets the V flag.
    pub const fn set_overflow(&mut self, set: bool) {
        self.set_bit(PSR_V, set);
    }

    /// Sets the Q flag.
    pub const fn set_sticky_overflow(&mut self, set: bool) {
        self.set_bit(PSR_Q, set);
    }

    /// Sets the I bit.
    pub const fn set_irq_disabled(&mut self, set: bool) {
        self.set_bit(PSR_I, set);
    }

    /// Sets the F bit.
    pub const fn set_fiq_disabled(&mut self, set: bool) {
        self.set_bit(PSR_F, set);
    }

    /// Sets the T bit.
    pub const fn set_thumb(&mut self, set: bool) {
        self.set_bit(PSR_T, set);
    }

    /// Raw mode field.
    #[must_use]
    pub const fn mode_bits(self) -> u32 {
        self.0 & PSR_MODE_MASK
    }

    /// Decoded mode, `None` for reserved encodings.
    #[must_use]
    pub const fn mode(self) -> Option<Mode> {
        Mode::from_bits(self.0)
    }

    /// Replaces the mode field.
    pub const fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !PSR_MODE_MASK) | mode.bits();
    }

    /// Anything but user mode is privileged.
    #[must_use]
    pub const fn privileged(self) -> bool {
        self.mode_bits() != Mode::User.bits()
    }

    /// Sets N and Z from a result value.
    pub const fn set_nz(&mut self, result: u32) {
        self.set_negative(result & 0x8000_0000 != 0);
        self.set_zero(result == 0);
    }
}
