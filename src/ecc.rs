//! Page-level error correction.
//!
//! A page is split into fixed-size codewords, each protected by a
//! shortened BCH code correcting up to four bit errors. Parity lives
//! in the spare area so the data region keeps its natural layout.

use nand_bch::codec::{DATA_LEN, MAX_ERRORS, PARITY_LEN};
use nand_bch::BchError;

use crate::address::{DATA_BYTES_PER_PAGE, TOTAL_BYTES_PER_PAGE};

/// Codewords protecting one page. The last codeword covers only the
/// tail of the data region and is zero padded up to the block length.
pub const CODEWORDS_PER_PAGE: usize = DATA_BYTES_PER_PAGE.div_ceil(DATA_LEN);

/// Data bytes covered by the final, short codeword.
pub const LAST_CODEWORD_LEN: usize = DATA_BYTES_PER_PAGE - (CODEWORDS_PER_PAGE - 1) * DATA_LEN;

/// Byte offset of the parity region within the page. Everything
/// between the data region and this offset is left to the caller,
/// including the bad-block marker byte.
pub const ECC_PARITY_OFFSET: usize = TOTAL_BYTES_PER_PAGE - CODEWORDS_PER_PAGE * PARITY_LEN;

/// Worst case correctable bit errors across a whole page.
pub const MAX_ERRORS_PER_PAGE: usize = CODEWORDS_PER_PAGE * MAX_ERRORS;

/// Compute parity for every codeword of `page` and store it in the
/// parity region. `page` must be a full page buffer.
pub fn encode_page(page: &mut [u8]) -> Result<(), BchError> {
    if page.len() != TOTAL_BYTES_PER_PAGE {
        return Err(BchError::InvalidParameter);
    }
    let mut block = [0u8; DATA_LEN];
    for cw in 0..CODEWORDS_PER_PAGE {
        stage_codeword(page, cw, &mut block);
        let parity = nand_bch::codec::encode(&block);
        let at = ECC_PARITY_OFFSET + cw * PARITY_LEN;
        page[at..at + PARITY_LEN].copy_from_slice(&parity);
    }
    Ok(())
}

/// Check every codeword of `page` against its stored parity and repair
/// the data region in place. Returns the total number of corrected bit
/// errors, including any that landed in the parity bytes themselves.
pub fn correct_page(page: &mut [u8]) -> Result<usize, BchError> {
    if page.len() != TOTAL_BYTES_PER_PAGE {
        return Err(BchError::InvalidParameter);
    }
    let mut total = 0;
    let mut block = [0u8; DATA_LEN];
    for cw in 0..CODEWORDS_PER_PAGE {
        let at = ECC_PARITY_OFFSET + cw * PARITY_LEN;
        let mut parity = [0u8; PARITY_LEN];
        parity.copy_from_slice(&page[at..at + PARITY_LEN]);

        stage_codeword(page, cw, &mut block);
        total += nand_bch::codec::decode(&mut block, &parity)?;

        let start = cw * DATA_LEN;
        let end = DATA_BYTES_PER_PAGE.min(start + DATA_LEN);
        page[start..end].copy_from_slice(&block[..end - start]);
    }
    Ok(total)
}

/// Copy the data bytes of codeword `cw` into `block`, zero padding the
/// short final codeword up to the full block length.
fn stage_codeword(page: &[u8], cw: usize, block: &mut [u8; DATA_LEN]) {
    let start = cw * DATA_LEN;
    let end = DATA_BYTES_PER_PAGE.min(start + DATA_LEN);
    block[..end - start].copy_from_slice(&page[start..end]);
    block[end - start..].fill(0);
}
