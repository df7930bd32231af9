//! ONFI parameter page parsing and validation.

use crate::address;

/// Size of one parameter page copy.
pub const PARAMETER_PAGE_SIZE: usize = 256;
/// Redundant copies the device serves back to back.
pub const PARAMETER_PAGE_COPIES: usize = 3;
/// Signature at the start of every valid copy.
pub const ONFI_SIGNATURE: [u8; 4] = *b"ONFI";

const CRC_POLY: u16 = 0x8005;
const CRC_INIT: u16 = 0x4F4E;
/// Offset of the little-endian CRC over bytes 0..254.
const CRC_OFFSET: usize = 254;

// Geometry field offsets, all little-endian.
const DATA_BYTES_PER_PAGE_OFFSET: usize = 80;
const SPARE_BYTES_PER_PAGE_OFFSET: usize = 84;
const PAGES_PER_BLOCK_OFFSET: usize = 92;
const BLOCKS_PER_LUN_OFFSET: usize = 96;
const LUNS_PER_CE_OFFSET: usize = 100;

/// ONFI CRC-16: polynomial 0x8005, initial value 0x4F4E, MSB first,
/// no reflection, no final XOR.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &byte in bytes {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Geometry fields extracted from a validated parameter page copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterPage {
    pub data_bytes_per_page: u32,
    pub spare_bytes_per_page: u16,
    pub pages_per_block: u32,
    pub blocks_per_lun: u32,
    pub luns_per_ce: u8,
}

impl ParameterPage {
    /// Parse one copy; `None` when the signature or CRC is wrong.
    pub fn parse(raw: &[u8; PARAMETER_PAGE_SIZE]) -> Option<Self> {
        if raw[..4] != ONFI_SIGNATURE {
            return None;
        }
        let stored = u16::from_le_bytes([raw[CRC_OFFSET], raw[CRC_OFFSET + 1]]);
        if crc16(&raw[..CRC_OFFSET]) != stored {
            return None;
        }
        Some(ParameterPage {
            data_bytes_per_page: le32(raw, DATA_BYTES_PER_PAGE_OFFSET),
            spare_bytes_per_page: le16(raw, SPARE_BYTES_PER_PAGE_OFFSET),
            pages_per_block: le32(raw, PAGES_PER_BLOCK_OFFSET),
            blocks_per_lun: le32(raw, BLOCKS_PER_LUN_OFFSET),
            luns_per_ce: raw[LUNS_PER_CE_OFFSET],
        })
    }

    /// Compare the reported geometry against the compiled-in constants.
    pub fn matches_geometry(&self) -> bool {
        self.data_bytes_per_page == address::DATA_BYTES_PER_PAGE as u32
            && self.spare_bytes_per_page == address::SPARE_BYTES_PER_PAGE as u16
            && self.pages_per_block == address::PAGES_PER_BLOCK as u32
            && self.blocks_per_lun == address::BLOCKS_PER_LUN as u32
            && self.luns_per_ce == address::LUNS_PER_CE
    }
}

fn le16(raw: &[u8; PARAMETER_PAGE_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([raw[offset], raw[offset + 1]])
}

fn le32(raw: &[u8; PARAMETER_PAGE_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        raw[offset],
        raw[offset + 1],
        raw[offset + 2],
        raw[offset + 3],
    ])
}

/// Build a parameter page copy describing the compiled-in geometry,
/// with a valid CRC. Used by the test bench.
pub fn build_parameter_page() -> [u8; PARAMETER_PAGE_SIZE] {
    let mut raw = [0u8; PARAMETER_PAGE_SIZE];
    raw[..4].copy_from_slice(&ONFI_SIGNATURE);
    raw[DATA_BYTES_PER_PAGE_OFFSET..DATA_BYTES_PER_PAGE_OFFSET + 4]
        .copy_from_slice(&(address::DATA_BYTES_PER_PAGE as u32).to_le_bytes());
    raw[SPARE_BYTES_PER_PAGE_OFFSET..SPARE_BYTES_PER_PAGE_OFFSET + 2]
        .copy_from_slice(&(address::SPARE_BYTES_PER_PAGE as u16).to_le_bytes());
    raw[PAGES_PER_BLOCK_OFFSET..PAGES_PER_BLOCK_OFFSET + 4]
        .copy_from_slice(&(address::PAGES_PER_BLOCK as u32).to_le_bytes());
    raw[BLOCKS_PER_LUN_OFFSET..BLOCKS_PER_LUN_OFFSET + 4]
        .copy_from_slice(&(address::BLOCKS_PER_LUN as u32).to_le_bytes());
    raw[LUNS_PER_CE_OFFSET] = address::LUNS_PER_CE;
    let crc = crc16(&raw[..CRC_OFFSET]);
    raw[CRC_OFFSET..CRC_OFFSET + 2].copy_from_slice(&crc.to_le_bytes());
    raw
}
