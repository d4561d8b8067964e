//! Fixed physical address map.

/// Physical base of RAM.
pub const RAM_START: u32 = 0x0000_0000;
/// RAM size for the MMU profile (32 MiB).
pub const DEFAULT_RAM_BYTES: usize = 32 * 1024 * 1024;
/// RAM size for the bare-metal profile (1 MiB).
pub const BARE_METAL_RAM_BYTES: usize = 1024 * 1024;

/// Interrupt controller base (8-byte window).
pub const INTC_BASE: u32 = 0x0300_0000;
/// Largest RAM that stays below the first device window.
pub const MAX_RAM_BYTES: usize = INTC_BASE as usize;
/// Interrupt controller decode mask.
pub const INTC_MASK: u32 = 0xFFFF_FFF8;
/// Timer base (8-byte window).
pub const TIMER_BASE: u32 = 0x0300_0010;
/// Timer decode mask.
pub const TIMER_MASK: u32 = 0xFFFF_FFF8;
/// Read-only executed-instruction counter.
pub const INSTRUCTION_COUNTER_ADDR: u32 = 0x0300_0020;
/// UART base (256-byte window).
pub const UART_BASE: u32 = 0x0301_0000;
/// UART decode mask.
pub const UART_MASK: u32 = 0xFFFF_FF00;

/// Decode entry for one memory-mapped device window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// Short device name.
    pub name: &'static str,
    /// Address bits that select the window.
    pub mask: u32,
    /// Value of the selected bits inside the window.
    pub prefix: u32,
}

impl RegionDescriptor {
    /// Returns `true` when `addr` falls inside this window.
    #[must_use]
    pub const fn contains(self, addr: u32) -> bool {
        addr & self.mask == self.prefix
    }

    /// Offset of `addr` within the window.
    #[must_use]
    pub const fn offset(self, addr: u32) -> u32 {
        addr & !self.mask
    }

    /// Size of the window in bytes.
    #[must_use]
    pub const fn size(self) -> u32 {
        (!self.mask).wrapping_add(1)
    }
}

/// Device windows of the standard machine, in bus scan order.
pub const STANDARD_DEVICE_REGIONS: [RegionDescriptor; 3] = [
    RegionDescriptor {
        name: "intc",
        mask: INTC_MASK,
        prefix: INTC_BASE,
    },
    RegionDescriptor {
        name: "timer",
        mask: TIMER_MASK,
        prefix: TIMER_BASE,
    },
    RegionDescriptor {
        name: "uart",
        mask: UART_MASK,
        prefix: UART_BASE,
    },
];

const _: () = assert_device_layout();

const fn assert_device_layout() {
    assert!(DEFAULT_RAM_BYTES <= MAX_RAM_BYTES, "default RAM overlaps devices");
    let mut i = 0;
    while i < STANDARD_DEVICE_REGIONS.len() {
        let region = STANDARD_DEVICE_REGIONS[i];
        assert!(
            region.prefix & !region.mask == 0,
            "device prefix must be window aligned"
        );
        assert!(
            region.prefix as usize >= MAX_RAM_BYTES,
            "device window overlaps RAM"
        );
        assert!(
            !region.contains(INSTRUCTION_COUNTER_ADDR),
            "device window shadows the instruction counter"
        );
        let mut j = i + 1;
        while j < STANDARD_DEVICE_REGIONS.len() {
            let other = STANDARD_DEVICE_REGIONS[j];
            assert!(
                !region.contains(other.prefix) && !other.contains(region.prefix),
                "device windows overlap"
            );
            j += 1;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_windows_have_documented_sizes() {
        assert_eq!(STANDARD_DEVICE_REGIONS[0].size(), 8);
        assert_eq!(STANDARD_DEVICE_REGIONS[1].size(), 8);
        assert_eq!(STANDARD_DEVICE_REGIONS[2].size(), 256);
    }

    #[test]
    fn offsets_are_relative_to_window_base() {
        let uart = STANDARD_DEVICE_REGIONS[2];
        assert!(uart.contains(UART_BASE + 0x14));
        assert_eq!(uart.offset(UART_BASE + 0x14), 0x14);
        assert!(!uart.contains(UART_BASE + 0x100));
    }
}
