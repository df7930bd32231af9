//! Blocking driver for ONFI parallel NAND flash on a memory-mapped
//! byte bus, with page-level BCH error correction.
//!
//! The driver talks to the chip through the [`bus::NandBus`] trait and
//! the `embedded-hal` pin and delay traits, so it runs unchanged on
//! hardware and against a simulator. Pages are 8192 data bytes plus
//! 448 spare bytes; [`ecc`] splits each page into BCH codewords that
//! correct up to four bit errors apiece.
//!
//! ## Features
//!
//! - `defmt`: route driver logging through `defmt` and derive
//!   `defmt::Format` on public types.
//! - `log`: route driver logging through the `log` facade instead.
//! - `serde`: serde derives on plain data types.
#![cfg_attr(not(test), no_std)]

// Declared first so the logging shims are visible crate-wide.
#[macro_use]
pub(crate) mod fmt;

pub mod address;
pub mod bad_block;
pub mod bus;
pub mod cmd;
pub mod device;
pub mod ecc;
pub mod error;
pub mod onfi;

pub use address::NandAddress;
pub use bad_block::BadBlockTable;
pub use bus::NandBus;
pub use cmd::Status;
pub use device::OnfiNand;
pub use error::NandError;
