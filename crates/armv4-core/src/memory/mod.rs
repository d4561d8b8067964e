//! Physical memory model, fixed address map and the system bus.

/// RAM access helpers and alignment policy.
pub mod access;
/// System bus: translation, RAM and peripheral dispatch.
pub mod bus;
/// Fixed physical address map.
pub mod map;

pub use access::{read_ram, validate_alignment, write_ram};
pub use map::{
    RegionDescriptor, BARE_METAL_RAM_BYTES, DEFAULT_RAM_BYTES, INSTRUCTION_COUNTER_ADDR,
    INTC_BASE, INTC_MASK, MAX_RAM_BYTES, RAM_START, STANDARD_DEVICE_REGIONS, TIMER_BASE, TIMER_MASK, UART_BASE,
    UART_MASK,
};

/// Width of a single bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Halfword,
    /// 32-bit access.
    Word,
}

impl AccessWidth {
    /// Number of bytes moved.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Halfword => 2,
            Self::Word => 4,
        }
    }

    /// Low address bits that must be clear for a naturally aligned access.
    #[must_use]
    pub const fn alignment_mask(self) -> u32 {
        self.bytes() - 1
    }

    /// Mask applied to values moved at this width.
    #[must_use]
    pub const fn value_mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Halfword => 0xFFFF,
            Self::Word => u32::MAX,
        }
    }
}

/// Allocates zeroed RAM of `bytes` length.
#[must_use]
pub fn new_ram(bytes: usize) -> Box<[u8]> {
    vec![0; bytes].into_boxed_slice()
}
