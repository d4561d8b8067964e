use thiserror::Error;

/// Fault classes reported by the MMU, used for diagnostics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Access violated the natural alignment of its width.
    Alignment,
    /// No valid descriptor exists for the address.
    Translation,
    /// Domain access control denied the access.
    Domain,
    /// Access permission bits denied the access.
    Permission,
}

/// Architectural fault status codes, as stored in the low nibble of FSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultStatus {
    /// Misaligned access while alignment checking is enabled.
    #[error("alignment fault")]
    Alignment = 0x1,
    /// First-level descriptor is invalid.
    #[error("section translation fault")]
    SectionTranslation = 0x5,
    /// Second-level descriptor is invalid.
    #[error("page translation fault")]
    PageTranslation = 0x7,
    /// Section domain is marked no-access.
    #[error("section domain fault")]
    SectionDomain = 0x9,
    /// Page domain is marked no-access.
    #[error("page domain fault")]
    PageDomain = 0xB,
    /// Section AP bits denied the access.
    #[error("section permission fault")]
    SectionPermission = 0xD,
    /// Page or sub-page AP bits denied the access.
    #[error("page permission fault")]
    PagePermission = 0xF,
}

impl FaultStatus {
    /// Converts the status to its FSR nibble.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts an FSR nibble back into a fault status.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x1 => Some(Self::Alignment),
            0x5 => Some(Self::SectionTranslation),
            0x7 => Some(Self::PageTranslation),
            0x9 => Some(Self::SectionDomain),
            0xB => Some(Self::PageDomain),
            0xD => Some(Self::SectionPermission),
            0xF => Some(Self::PagePermission),
            _ => None,
        }
    }

    /// Returns the diagnostics class for this status.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::Alignment => FaultClass::Alignment,
            Self::SectionTranslation | Self::PageTranslation => FaultClass::Translation,
            Self::SectionDomain | Self::PageDomain => FaultClass::Domain,
            Self::SectionPermission | Self::PagePermission => FaultClass::Permission,
        }
    }

    /// Whether the FSR domain field is meaningful for this status.
    #[must_use]
    pub const fn records_domain(self) -> bool {
        matches!(self.class(), FaultClass::Domain | FaultClass::Permission)
    }
}

/// A translation fault raised by the MMU for one access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{status} at {address:#010x} (domain {domain})")]
pub struct MmuFault {
    /// Fault status code.
    pub status: FaultStatus,
    /// Domain of the descriptor that faulted, zero when unknown.
    pub domain: u8,
    /// Faulting virtual address.
    pub address: u32,
}

impl MmuFault {
    /// FSR value for this fault: `(domain << 4) | status`.
    #[must_use]
    pub const fn fsr(self) -> u32 {
        let domain = if self.status.records_domain() {
            (self.domain as u32 & 0xF) << 4
        } else {
            0
        };
        domain | self.status.as_u8() as u32
    }
}

/// Errors surfaced by the core.
///
/// [`CoreError::Abort`] is architectural: the execution engine converts it into
/// a prefetch or data abort exception. Every other variant is host-fatal and
/// halts the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CoreError {
    /// MMU fault for the current access.
    #[error("memory abort: {0}")]
    Abort(MmuFault),
    /// Physical address is backed by neither RAM nor a peripheral.
    #[error("unmapped physical address {addr:#010x}")]
    UnmappedAddress {
        /// Physical address of the access.
        addr: u32,
    },
    /// Branch-exchange to a Thumb target.
    #[error("thumb state is not supported (target {target:#010x})")]
    ThumbUnsupported {
        /// Target address of the branch or restored PC.
        target: u32,
    },
    /// Signed byte/halfword store encoding.
    #[error("unsupported signed store encoding {word:#010x}")]
    UnsupportedStore {
        /// Instruction word.
        word: u32,
    },
    /// AP = 0 with both S and R control bits set.
    #[error("illegal access permission configuration (control {control:#010x})")]
    IllegalPermissionConfig {
        /// CP15 control register value.
        control: u32,
    },
    /// Configured RAM would reach into the device windows.
    #[error("RAM of {bytes:#x} bytes overlaps the device windows (limit {limit:#x})")]
    RamTooLarge {
        /// Requested RAM size.
        bytes: usize,
        /// Largest accepted size.
        limit: usize,
    },
    /// Image does not fit in RAM at the requested base.
    #[error("image of {len} bytes does not fit at {base:#010x}")]
    ImageOutOfRange {
        /// Requested load address.
        base: u32,
        /// Image length in bytes.
        len: usize,
    },
}

impl CoreError {
    /// Returns `true` for errors that halt the core.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Abort(_))
    }
}

impl From<MmuFault> for CoreError {
    fn from(fault: MmuFault) -> Self {
        Self::Abort(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, FaultClass, FaultStatus, MmuFault};

    #[test]
    fn stable_status_roundtrip_is_bijective_for_defined_values() {
        for code in [0x1u8, 0x5, 0x7, 0x9, 0xB, 0xD, 0xF] {
            let status = FaultStatus::from_u8(code).expect("defined status code");
            assert_eq!(status.as_u8(), code);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(FaultStatus::from_u8(0x0).is_none());
        assert!(FaultStatus::from_u8(0x3).is_none());
        assert!(FaultStatus::from_u8(0x10).is_none());
    }

    #[test]
    fn class_mapping_groups_section_and_page_forms() {
        assert_eq!(FaultStatus::Alignment.class(), FaultClass::Alignment);
        assert_eq!(FaultStatus::PageTranslation.class(), FaultClass::Translation);
        assert_eq!(FaultStatus::SectionDomain.class(), FaultClass::Domain);
        assert_eq!(FaultStatus::PagePermission.class(), FaultClass::Permission);
    }

    #[test]
    fn fsr_packs_domain_only_for_domain_and_permission_faults() {
        let fault = MmuFault {
            status: FaultStatus::SectionPermission,
            domain: 3,
            address: 0x1000,
        };
        assert_eq!(fault.fsr(), 0x3D);

        let alignment = MmuFault {
            status: FaultStatus::Alignment,
            domain: 3,
            address: 0x1001,
        };
        assert_eq!(alignment.fsr(), 0x1);
    }

    #[test]
    fn only_aborts_are_recoverable() {
        let abort = CoreError::from(MmuFault {
            status: FaultStatus::SectionTranslation,
            domain: 0,
            address: 0,
        });
        assert!(!abort.is_fatal());
        assert!(CoreError::UnmappedAddress { addr: 0x0400_0000 }.is_fatal());
        assert!(CoreError::ThumbUnsupported { target: 1 }.is_fatal());
    }
}
