use super::{check_access_permission, reg, Access, Mmu};
use crate::fault::{CoreError, FaultStatus};

/// Granularity of the descriptor that produced a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Section,
    Page,
}

impl Level {
    const fn domain_fault(self) -> FaultStatus {
        match self {
            Self::Section => FaultStatus::SectionDomain,
            Self::Page => FaultStatus::PageDomain,
        }
    }

    const fn permission_fault(self) -> FaultStatus {
        match self {
            Self::Section => FaultStatus::SectionPermission,
            Self::Page => FaultStatus::PagePermission,
        }
    }
}

/// First-level descriptor address for `vaddr`.
#[must_use]
pub const fn first_level_address(ttb: u32, vaddr: u32) -> u32 {
    (ttb & 0xFFFF_C000) | ((vaddr >> 20) << 2)
}

/// Second-level descriptor address for a coarse (`fine == false`) or fine table.
#[must_use]
pub const fn second_level_address(descriptor: u32, vaddr: u32, fine: bool) -> u32 {
    if fine {
        (descriptor & 0xFFFF_F000) | (((vaddr >> 10) & 0x3FF) << 2)
    } else {
        (descriptor & 0xFFFF_FC00) | (((vaddr >> 12) & 0xFF) << 2)
    }
}

/// Physical address and AP bits selected by a second-level descriptor.
const fn page_entry(descriptor: u32, vaddr: u32) -> Option<(u32, u8)> {
    match descriptor & 0x3 {
        // Large page, 64 KiB with four 16 KiB subpages.
        0b01 => {
            let sub = (vaddr >> 14) & 0x3;
            Some((
                (descriptor & 0xFFFF_0000) | (vaddr & 0xFFFF),
                ((descriptor >> (4 + 2 * sub)) & 0x3) as u8,
            ))
        }
        // Small page, 4 KiB with four 1 KiB subpages.
        0b10 => {
            let sub = (vaddr >> 10) & 0x3;
            Some((
                (descriptor & 0xFFFF_F000) | (vaddr & 0xFFF),
                ((descriptor >> (4 + 2 * sub)) & 0x3) as u8,
            ))
        }
        // Tiny page, 1 KiB.
        0b11 => Some((
            (descriptor & 0xFFFF_FC00) | (vaddr & 0x3FF),
            ((descriptor >> 4) & 0x3) as u8,
        )),
        _ => None,
    }
}

impl Mmu {
    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn walk(
        &mut self,
        vaddr: u32,
        access: Access,
        mut read_descriptor: impl FnMut(u32) -> Result<u32, CoreError>,
    ) -> Result<u32, CoreError> {
        let ttb = self.regs[reg::TTB as usize];
        let first = read_descriptor(first_level_address(ttb, vaddr))?;
        let domain = ((first >> 5) & 0xF) as u8;

        match first & 0x3 {
            0b00 => Err(self.raise(FaultStatus::SectionTranslation, 0, vaddr)),
            0b10 => {
                let paddr = (first & 0xFFF0_0000) | (vaddr & 0x000F_FFFF);
                let ap = ((first >> 10) & 0x3) as u8;
                self.resolve(vaddr, paddr, domain, ap, Level::Section, access)
            }
            kind => {
                let fine = kind == 0b11;
                let second = read_descriptor(second_level_address(first, vaddr, fine))?;
                let Some((paddr, ap)) = page_entry(second, vaddr) else {
                    return Err(self.raise(FaultStatus::PageTranslation, domain, vaddr));
                };
                self.resolve(vaddr, paddr, domain, ap, Level::Page, access)
            }
        }
    }

    fn resolve(
        &mut self,
        vaddr: u32,
        paddr: u32,
        domain: u8,
        ap: u8,
        level: Level,
        access: Access,
    ) -> Result<u32, CoreError> {
        let dacr = self.regs[reg::DACR as usize];
        match (dacr >> (2 * u32::from(domain))) & 0x3 {
            // Client: AP bits decide.
            0b01 => {
                if check_access_permission(ap, self.control(), access.privileged, access.write)? {
                    self.tlb_mut(access.side).insert(vaddr, paddr, false, ap);
                    Ok(paddr)
                } else {
                    Err(self.raise(level.permission_fault(), domain, vaddr))
                }
            }
            // Manager: no permission check.
            0b11 => {
                self.tlb_mut(access.side).insert(vaddr, paddr, true, ap);
                Ok(paddr)
            }
            _ => Err(self.raise(level.domain_fault(), domain, vaddr)),
        }
    }
}
