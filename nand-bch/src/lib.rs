#![cfg_attr(not(test), no_std)]

//! BCH error correction for raw NAND pages.
//!
//! One codeword protects 122 data bytes with 5 parity bytes and
//! corrects up to 4 bit errors; a page-level wrapper chunks a page
//! into codewords and calls [`encode`]/[`decode`] per chunk.

pub mod codec;
pub mod gf;

pub use codec::{decode, encode, CODEWORD_BITS, DATA_LEN, MAX_ERRORS, PARITY_LEN};

/// Decode/encode failures. All are local to one codeword; the caller
/// decides whether to retry the read or retire the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BchError {
    /// A buffer has the wrong size for the codeword layout.
    #[error("invalid buffer size")]
    InvalidParameter,
    /// More errors than the code can correct.
    #[error("too many bit errors")]
    TooManyErrors,
    /// The error locator disagrees with its own roots; the word is
    /// uncorrectable rather than partially corrected.
    #[error("inconsistent error locator")]
    LocatorError,
}
