use super::psr::StatusWord;

/// Processor mode as encoded in CPSR bits 4:0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Mode {
    User = 0x10,
    Fiq = 0x11,
    Irq = 0x12,
    Svc = 0x13,
    Mon = 0x16,
    Abort = 0x17,
    Undef = 0x1B,
    System = 0x1F,
}

impl Mode {
    /// Raw 5-bit mode field value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Decodes the low five bits of a status word.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0x1F {
            0x10 => Some(Self::User),
            0x11 => Some(Self::Fiq),
            0x12 => Some(Self::Irq),
            0x13 => Some(Self::Svc),
            0x16 => Some(Self::Mon),
            0x17 => Some(Self::Abort),
            0x1B => Some(Self::Undef),
            0x1F => Some(Self::System),
            _ => None,
        }
    }

    /// Short lowercase name used in register dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "usr",
            Self::Fiq => "fiq",
            Self::Irq => "irq",
            Self::Svc => "svc",
            Self::Mon => "mon",
            Self::Abort => "abt",
            Self::Undef => "und",
            Self::System => "sys",
        }
    }
}

/// Storage class selecting a register bank and SPSR slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum ModeClass {
    User = 0,
    Fiq = 1,
    Irq = 2,
    Svc = 3,
    Undef = 4,
    Abort = 5,
    Mon = 6,
}

/// Number of register banks and status slots.
pub const MODE_CLASS_COUNT: usize = 7;

impl ModeClass {
    /// Bank and status-slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Maps the mode bits of `status` to their storage class.
///
/// System, user and monitor modes (and unrecognised encodings) share the user
/// bank. Undefined mode stores its r13/r14/SPSR in the monitor slot.
#[must_use]
pub const fn mode_class(status: StatusWord) -> ModeClass {
    match status.mode_bits() {
        0x11 => ModeClass::Fiq,
        0x12 => ModeClass::Irq,
        0x13 => ModeClass::Svc,
        0x17 => ModeClass::Abort,
        0x1B => ModeClass::Mon,
        _ => ModeClass::User,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_bits_roundtrip_for_recognised_modes() {
        for mode in [
            Mode::User,
            Mode::Fiq,
            Mode::Irq,
            Mode::Svc,
            Mode::Mon,
            Mode::Abort,
            Mode::Undef,
            Mode::System,
        ] {
            assert_eq!(Mode::from_bits(mode.bits()), Some(mode));
        }
        assert_eq!(Mode::from_bits(0x14), None);
        assert_eq!(Mode::from_bits(0x00), None);
    }

    #[test]
    fn class_mapping_keeps_user_system_and_monitor_together() {
        let class_of = |mode: Mode| mode_class(StatusWord::new(mode.bits()));
        assert_eq!(class_of(Mode::User), ModeClass::User);
        assert_eq!(class_of(Mode::System), ModeClass::User);
        assert_eq!(class_of(Mode::Mon), ModeClass::User);
        assert_eq!(class_of(Mode::Undef), ModeClass::Mon);
        assert_eq!(class_of(Mode::Fiq), ModeClass::Fiq);
        assert_eq!(class_of(Mode::Abort), ModeClass::Abort);
        assert_eq!(mode_class(StatusWord::new(0x15)), ModeClass::User);
    }
}
