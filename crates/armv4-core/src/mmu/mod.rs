//! System control coprocessor (CP15), MMU and TLBs.
//!
//! Every translated access goes through [`Mmu::translate`]. Faults are
//! recorded in FSR/FAR, latch the sticky fault flag and are returned to the
//! caller as [`CoreError::Abort`]. The execution engine clears the flag with
//! [`Mmu::take_fault`] once the abort is dispatched.

/// Translation lookaside buffers.
pub mod tlb;
/// Two-level page-table walk.
pub mod walk;

pub use tlb::{Tlb, TlbEntry, TLB_BLOCK_BITS, TLB_SIZE};

use crate::fault::{CoreError, FaultStatus, MmuFault};
use crate::memory::{validate_alignment, AccessWidth};

/// CP15 c1 bit: MMU enable.
pub const CONTROL_M: u32 = 1 << 0;
/// CP15 c1 bit: alignment checking.
pub const CONTROL_A: u32 = 1 << 1;
/// CP15 c1 bit: system protection.
pub const CONTROL_S: u32 = 1 << 8;
/// CP15 c1 bit: ROM protection.
pub const CONTROL_R: u32 = 1 << 9;
/// CP15 c1 bit: high exception vectors.
pub const CONTROL_V: u32 = 1 << 13;

/// CP15 c0 main ID value (ARM920T-class, ARMv4T).
pub const CP15_MAIN_ID: u32 = 0x4112_9200;
/// CP15 c0 cache type value.
pub const CP15_CACHE_TYPE: u32 = 0x0D17_2172;
/// Value read back from c7 test-and-clean operations (Z set, cache clean).
pub const CP15_CACHE_CLEAN: u32 = 1 << 30;

/// CP15 register numbers used by the MMU.
pub mod reg {
    /// ID and cache type.
    pub const ID: u32 = 0;
    /// Control.
    pub const CONTROL: u32 = 1;
    /// Translation table base.
    pub const TTB: u32 = 2;
    /// Domain access control.
    pub const DACR: u32 = 3;
    /// Fault status.
    pub const FSR: u32 = 5;
    /// Fault address.
    pub const FAR: u32 = 6;
    /// Cache maintenance.
    pub const CACHE: u32 = 7;
    /// TLB maintenance.
    pub const TLB: u32 = 8;
    /// Process ID.
    pub const PID: u32 = 13;
}

/// Which TLB an access goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlbSide {
    /// Instruction fetches.
    Instruction,
    /// Loads and stores.
    Data,
}

/// Attributes of one translated access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// TLB used for the access.
    pub side: TlbSide,
    /// Store rather than load.
    pub write: bool,
    /// Permission checks use privileged rules.
    pub privileged: bool,
    /// Access width, for alignment checking.
    pub width: AccessWidth,
}

impl Access {
    /// A word-sized instruction fetch.
    #[must_use]
    pub const fn fetch(privileged: bool) -> Self {
        Self {
            side: TlbSide::Instruction,
            write: false,
            privileged,
            width: AccessWidth::Word,
        }
    }

    /// A data access.
    #[must_use]
    pub const fn data(write: bool, privileged: bool, width: AccessWidth) -> Self {
        Self {
            side: TlbSide::Data,
            write,
            privileged,
            width,
        }
    }
}

/// TLB hit accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TlbStats {
    /// Accesses served by a TLB entry.
    pub hits: u64,
    /// Translated accesses that reached the TLB probe.
    pub total: u64,
}

impl TlbStats {
    /// Accesses that needed a table walk.
    #[must_use]
    pub const fn misses(self) -> u64 {
        self.total - self.hits
    }
}

/// Checks a 2-bit AP code.
///
/// AP 0 depends on the S and R control bits: with S clear any read is
/// allowed whatever R says, S alone grants privileged reads only.
///
/// # Errors
///
/// Returns [`CoreError::IllegalPermissionConfig`] when AP is 0 and both S and
/// R are set.
pub const fn check_access_permission(
    ap: u8,
    control: u32,
    privileged: bool,
    write: bool,
) -> Result<bool, CoreError> {
    match ap & 0x3 {
        0 => match (control & CONTROL_S != 0, control & CONTROL_R != 0) {
            (true, true) => Err(CoreError::IllegalPermissionConfig { control }),
            (true, false) => Ok(privileged && !write),
            (false, _) => Ok(!write),
        },
        1 => Ok(privileged),
        2 => Ok(privileged || !write),
        _ => Ok(true),
    }
}

/// CP15 register file, MMU state and both TLBs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mmu {
    regs: [u32; 16],
    fault: bool,
    itlb: Tlb,
    dtlb: Tlb,
    stats: TlbStats,
    enable_allowed: bool,
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Mmu {
    /// Creates an MMU in the reset state. With `enable_allowed` clear the M
    /// bit can never be set.
    #[must_use]
    pub fn new(enable_allowed: bool) -> Self {
        Self {
            regs: [0; 16],
            fault: false,
            itlb: Tlb::default(),
            dtlb: Tlb::default(),
            stats: TlbStats::default(),
            enable_allowed,
        }
    }

    /// Restores reset values: MMU off, TLBs empty, counters kept.
    pub fn reset(&mut self) {
        self.regs = [0; 16];
        self.fault = false;
        self.itlb.invalidate_all();
        self.dtlb.invalidate_all();
    }

    /// CP15 c1.
    #[must_use]
    pub const fn control(&self) -> u32 {
        self.regs[reg::CONTROL as usize]
    }

    /// Whether translation is on.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.control() & CONTROL_M != 0
    }

    /// Whether exceptions vector to `0xFFFF_0000`.
    #[must_use]
    pub const fn high_vectors(&self) -> bool {
        self.control() & CONTROL_V != 0
    }

    /// CP15 c5.
    #[must_use]
    pub const fn fault_status(&self) -> u32 {
        self.regs[reg::FSR as usize]
    }

    /// CP15 c6.
    #[must_use]
    pub const fn fault_address(&self) -> u32 {
        self.regs[reg::FAR as usize]
    }

    /// Sticky fault flag.
    #[must_use]
    pub const fn fault_pending(&self) -> bool {
        self.fault
    }

    /// Clears the sticky fault flag, returning its previous value.
    pub const fn take_fault(&mut self) -> bool {
        let was = self.fault;
        self.fault = false;
        was
    }

    /// TLB hit accounting.
    #[must_use]
    pub const fn stats(&self) -> TlbStats {
        self.stats
    }

    /// The TLB for `side`.
    #[must_use]
    pub const fn tlb(&self, side: TlbSide) -> &Tlb {
        match side {
            TlbSide::Instruction => &self.itlb,
            TlbSide::Data => &self.dtlb,
        }
    }

    pub(crate) const fn tlb_mut(&mut self, side: TlbSide) -> &mut Tlb {
        match side {
            TlbSide::Instruction => &mut self.itlb,
            TlbSide::Data => &mut self.dtlb,
        }
    }

    pub(crate) fn raise(&mut self, status: FaultStatus, domain: u8, address: u32) -> CoreError {
        let fault = MmuFault {
            status,
            domain,
            address,
        };
        self.regs[reg::FSR as usize] = fault.fsr();
        self.regs[reg::FAR as usize] = address;
        self.fault = true;
        log::debug!("mmu: {fault}");
        CoreError::Abort(fault)
    }

    /// Translates `vaddr` for `access`.
    ///
    /// `read_descriptor` fetches a page-table word from physical memory.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Abort`] for alignment, translation, domain and
    /// permission faults, or a fatal error from the permission check or the
    /// descriptor read.
    pub fn translate(
        &mut self,
        vaddr: u32,
        access: Access,
        read_descriptor: impl FnMut(u32) -> Result<u32, CoreError>,
    ) -> Result<u32, CoreError> {
        if !self.enabled() {
            return Ok(vaddr);
        }

        if self.control() & CONTROL_A != 0 {
            if let Err(status) = validate_alignment(vaddr, access.width) {
                return Err(self.raise(status, 0, vaddr));
            }
        }

        self.stats.total += 1;
        if let Some(entry) = self.tlb(access.side).lookup(vaddr) {
            if entry.manager
                || check_access_permission(
                    entry.ap,
                    self.control(),
                    access.privileged,
                    access.write,
                )?
            {
                self.stats.hits += 1;
                return Ok(entry.translate(vaddr));
            }
        }

        self.walk(vaddr, access, read_descriptor)
    }

    /// Reads a CP15 register for MRC.
    #[must_use]
    pub fn read_register(&self, crn: u32, opc2: u32) -> u32 {
        match crn {
            reg::ID => {
                if opc2 == 1 {
                    CP15_CACHE_TYPE
                } else {
                    CP15_MAIN_ID
                }
            }
            reg::CONTROL | reg::TTB | reg::DACR | reg::FSR | reg::FAR | reg::PID => {
                self.regs[crn as usize]
            }
            reg::CACHE => CP15_CACHE_CLEAN,
            _ => {
                log::warn!("cp15: read of unimplemented register c{crn}");
                0
            }
        }
    }

    /// Writes a CP15 register for MCR.
    pub fn write_register(&mut self, crn: u32, crm: u32, opc2: u32, value: u32) {
        match crn {
            reg::ID => {}
            reg::CONTROL => {
                let value = if self.enable_allowed {
                    value
                } else {
                    value & !CONTROL_M
                };
                self.regs[reg::CONTROL as usize] = value;
            }
            reg::TTB | reg::DACR | reg::FSR | reg::FAR | reg::PID => {
                self.regs[crn as usize] = value;
            }
            reg::CACHE => {}
            reg::TLB => self.tlb_operation(crm, opc2, value),
            _ => log::warn!("cp15: write of unimplemented register c{crn} = {value:#010x}"),
        }
    }

    fn tlb_operation(&mut self, crm: u32, opc2: u32, mva: u32) {
        let sides: &[TlbSide] = match crm {
            5 => &[TlbSide::Instruction],
            6 => &[TlbSide::Data],
            7 => &[TlbSide::Instruction, TlbSide::Data],
            _ => {
                log::warn!("cp15: unknown tlb operation c8, c{crm}, {opc2}");
                return;
            }
        };
        for &side in sides {
            match opc2 {
                0 => self.tlb_mut(side).invalidate_all(),
                1 => self.tlb_mut(side).invalidate(mva),
                _ => log::warn!("cp15: unknown tlb operation c8, c{crm}, {opc2}"),
            }
        }
        log::debug!("cp15: tlb c8, c{crm}, {opc2} mva={mva:#010x}");
    }
}
