//! Logical NAND addressing and the 5-cycle hardware address stream.

use crate::error::NandError;

/// Independently addressable dies per chip enable.
pub const LUNS_PER_CE: u8 = 2;
/// Erase blocks per LUN.
pub const BLOCKS_PER_LUN: u16 = 2048;
/// Program pages per block.
pub const PAGES_PER_BLOCK: u16 = 128;
/// User data bytes per page.
pub const DATA_BYTES_PER_PAGE: usize = 8192;
/// Spare (out-of-band) bytes per page.
pub const SPARE_BYTES_PER_PAGE: usize = 448;
/// Full page size, data + spare.
pub const TOTAL_BYTES_PER_PAGE: usize = DATA_BYTES_PER_PAGE + SPARE_BYTES_PER_PAGE;
/// Column of the bad-block marker byte (first spare byte; 0xFF = good).
pub const BAD_BLOCK_MARKER_COLUMN: u16 = DATA_BYTES_PER_PAGE as u16;

/// Address cycles sent for page-level operations.
pub const ADDRESS_CYCLES: usize = 5;
/// Row-only cycles sent for block erase.
pub const ROW_CYCLES: usize = 3;

/// Logical address of a byte within the device.
///
/// Cycle layout on the bus:
///
/// |         | IO7  | IO6  | IO5  | IO4  | IO3  | IO2  | IO1  | IO0  |
/// | ------- | ---  | ---  | ---  | ---  | ---  | ---  | ---  | ---  |
/// | Cycle 0 | CA7  | CA6  | CA5  | CA4  | CA3  | CA2  | CA1  | CA0  |
/// | Cycle 1 | -    | -    | CA13 | CA12 | CA11 | CA10 | CA9  | CA8  |
/// | Cycle 2 | BA0  | PA6  | PA5  | PA4  | PA3  | PA2  | PA1  | PA0  |
/// | Cycle 3 | BA8  | BA7  | BA6  | BA5  | BA4  | BA3  | BA2  | BA1  |
/// | Cycle 4 | -    | -    | -    | -    | BA11 | BA10 | BA9  | LA0  |
///
/// CAx: column, PAx: page, BAx: block, LA0: LUN select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NandAddress {
    pub lun: u8,
    pub block: u16,
    pub page: u16,
    pub column: u16,
}

impl NandAddress {
    pub fn new(lun: u8, block: u16, page: u16, column: u16) -> Self {
        NandAddress {
            lun,
            block,
            page,
            column,
        }
    }

    /// Row-only address for block-level operations.
    pub fn row(lun: u8, block: u16) -> Self {
        NandAddress {
            lun,
            block,
            page: 0,
            column: 0,
        }
    }

    /// Check every field against the device geometry.
    pub fn validate(&self) -> Result<(), AddressOutOfBounds> {
        if self.lun >= LUNS_PER_CE
            || self.block >= BLOCKS_PER_LUN
            || self.page >= PAGES_PER_BLOCK
            || self.column >= TOTAL_BYTES_PER_PAGE as u16
        {
            return Err(AddressOutOfBounds);
        }
        Ok(())
    }

    /// Pack into the 5-cycle address stream.
    pub fn cycles(&self) -> AddressCycles {
        AddressCycles([
            self.column as u8,
            (self.column >> 8) as u8 & 0x3F,
            (self.page as u8 & 0x7F) | ((self.block as u8 & 0x01) << 7),
            (self.block >> 1) as u8,
            (self.lun & 0x01) | ((self.block >> 9) as u8 & 0x07) << 1,
        ])
    }

    /// Unpack the 5-cycle stream back into a logical address.
    pub fn from_cycles(cycles: &AddressCycles) -> Self {
        let c = &cycles.0;
        NandAddress {
            lun: c[4] & 0x01,
            block: ((c[2] as u16 >> 7) & 0x01)
                | ((c[3] as u16) << 1)
                | (((c[4] as u16 >> 1) & 0x07) << 9),
            page: c[2] as u16 & 0x7F,
            column: c[0] as u16 | ((c[1] as u16 & 0x3F) << 8),
        }
    }
}

/// The packed hardware address stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressCycles([u8; ADDRESS_CYCLES]);

impl AddressCycles {
    /// All 5 cycles, for page-level operations.
    pub fn full(&self) -> &[u8] {
        &self.0
    }

    /// The 3 row cycles, for block erase.
    pub fn rows(&self) -> &[u8] {
        &self.0[ADDRESS_CYCLES - ROW_CYCLES..]
    }
}

/// Marker error raised by [`NandAddress::validate`]; converts into
/// [`NandError::AddressOutOfBounds`] so `?` works inside operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressOutOfBounds;

impl<BE> From<AddressOutOfBounds> for NandError<BE> {
    fn from(_: AddressOutOfBounds) -> Self {
        NandError::AddressOutOfBounds
    }
}
