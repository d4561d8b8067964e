//! RAM access helpers and the alignment policy used by the MMU.

use crate::fault::FaultStatus;
use crate::memory::AccessWidth;

/// Validates natural alignment of an access.
///
/// # Errors
///
/// Returns [`FaultStatus::Alignment`] when the low address bits required to be
/// clear for `width` are set.
pub const fn validate_alignment(addr: u32, width: AccessWidth) -> Result<(), FaultStatus> {
    if addr & width.alignment_mask() == 0 {
        Ok(())
    } else {
        Err(FaultStatus::Alignment)
    }
}

const fn aligned_down(addr: u32, width: AccessWidth) -> usize {
    (addr & !width.alignment_mask()) as usize
}

/// Reads little-endian data from RAM, `None` when outside it.
///
/// Word and halfword accesses ignore the low address bits.
#[must_use]
pub fn read_ram(ram: &[u8], addr: u32, width: AccessWidth) -> Option<u32> {
    let start = aligned_down(addr, width);
    let bytes = ram.get(start..start.checked_add(width.bytes() as usize)?)?;
    Some(
        bytes
            .iter()
            .rev()
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)),
    )
}

/// Writes little-endian data to RAM, returning `false` when outside it.
#[must_use]
pub fn write_ram(ram: &mut [u8], addr: u32, value: u32, width: AccessWidth) -> bool {
    let start = aligned_down(addr, width);
    let Some(end) = start.checked_add(width.bytes() as usize) else {
        return false;
    };
    let Some(bytes) = ram.get_mut(start..end) else {
        return false;
    };
    for (i, byte) in bytes.iter_mut().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        {
            *byte = (value >> (8 * i)) as u8;
        }
    }
    true
}
