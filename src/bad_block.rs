//! In-memory registry of known-defective blocks.
//!
//! Populated by the factory scan during initialization and amended at
//! runtime when the caller retires a block after a failed program or
//! erase. Entries are never removed within a session and the driver
//! does not deduplicate; the table is not persisted.

/// Fixed table capacity.
pub const BAD_BLOCK_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BadBlockEntry {
    pub block: u16,
    pub lun: u8,
}

/// Raised by [`BadBlockTable::insert`] when the table is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull;

pub struct BadBlockTable {
    entries: [BadBlockEntry; BAD_BLOCK_CAPACITY],
    len: usize,
}

impl BadBlockTable {
    pub const fn new() -> Self {
        BadBlockTable {
            entries: [BadBlockEntry { block: 0, lun: 0 }; BAD_BLOCK_CAPACITY],
            len: 0,
        }
    }

    pub fn insert(&mut self, block: u16, lun: u8) -> Result<(), TableFull> {
        if self.len == BAD_BLOCK_CAPACITY {
            return Err(TableFull);
        }
        self.entries[self.len] = BadBlockEntry { block, lun };
        self.len += 1;
        Ok(())
    }

    pub fn contains(&self, block: u16, lun: u8) -> bool {
        self.entries[..self.len]
            .iter()
            .any(|e| e.block == block && e.lun == lun)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &BadBlockEntry> {
        self.entries[..self.len].iter()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for BadBlockTable {
    fn default() -> Self {
        BadBlockTable::new()
    }
}
