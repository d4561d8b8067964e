/// Entries per TLB side.
pub const TLB_SIZE: usize = 256;

/// Translation granule cached by one entry (1 KiB).
pub const TLB_BLOCK_BITS: u32 = 10;

/// One cached translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TlbEntry {
    /// Virtual address bits 31:10.
    pub tag: u32,
    /// Physical base of the 1 KiB block.
    pub phys: u32,
    /// Domain was manager when filled; AP is not checked on hit.
    pub manager: bool,
    /// AP bits of the block.
    pub ap: u8,
    /// Slot holds a translation.
    pub valid: bool,
}

impl TlbEntry {
    /// Physical address of `vaddr` through this entry.
    #[must_use]
    pub const fn translate(self, vaddr: u32) -> u32 {
        self.phys | (vaddr & ((1 << TLB_BLOCK_BITS) - 1))
    }
}

/// Direct-mapped translation cache for one side (instruction or data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlb {
    entries: Box<[TlbEntry]>,
}

impl Default for Tlb {
    fn default() -> Self {
        Self {
            entries: vec![TlbEntry::default(); TLB_SIZE].into_boxed_slice(),
        }
    }
}

const fn tag_of(vaddr: u32) -> u32 {
    vaddr >> TLB_BLOCK_BITS
}

const fn index_of(vaddr: u32) -> usize {
    tag_of(vaddr) as usize % TLB_SIZE
}

impl Tlb {
    /// Returns the valid entry whose tag matches `vaddr`.
    #[must_use]
    pub fn lookup(&self, vaddr: u32) -> Option<TlbEntry> {
        let entry = self.entries[index_of(vaddr)];
        (entry.valid && entry.tag == tag_of(vaddr)).then_some(entry)
    }

    /// Caches the translation of `vaddr` to `paddr`, evicting the slot's previous entry.
    pub fn insert(&mut self, vaddr: u32, paddr: u32, manager: bool, ap: u8) {
        self.entries[index_of(vaddr)] = TlbEntry {
            tag: tag_of(vaddr),
            phys: paddr & !((1 << TLB_BLOCK_BITS) - 1),
            manager,
            ap,
            valid: true,
        };
    }

    /// Drops every entry.
    pub fn invalidate_all(&mut self) {
        self.entries.fill(TlbEntry::default());
    }

    /// Drops the entry caching `vaddr`, if any.
    pub fn invalidate(&mut self, vaddr: u32) {
        let slot = &mut self.entries[index_of(vaddr)];
        if slot.tag == tag_of(vaddr) {
            slot.valid = false;
        }
    }

    /// Number of valid entries.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.entries.iter().filter(|entry| entry.valid).count()
    }
}
