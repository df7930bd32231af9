//! Byte-bus collaborator and the command/address/data phase helpers.
//!
//! The NAND sits in a memory-mapped window: writing a byte with the
//! CLE address line high latches a command, with ALE high latches an
//! address cycle, and plain accesses move data. The collaborator only
//! has to move single bytes; the sequencing lives here.

use crate::cmd::{Command, Status};
use crate::error::NandError;

/// Base of the memory-mapped NAND data window.
pub const NAND_DATA_ADDRESS: u32 = 0x6000_0000;
/// Address-line offset that asserts CLE (command latch enable).
pub const NAND_CLE_OFFSET: u32 = 1 << 22;
/// Address-line offset that asserts ALE (address latch enable).
pub const NAND_ALE_OFFSET: u32 = 1 << 21;

/// Single-byte external bus access.
///
/// Implementations serialize the individual byte access internally;
/// whole command sequences still require the external per-operation
/// lock described in the crate docs.
pub trait NandBus {
    type Error;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Self::Error>;
    fn read_byte(&mut self, address: u32) -> Result<u8, Self::Error>;
}

impl<T: NandBus + ?Sized> NandBus for &mut T {
    type Error = T::Error;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Self::Error> {
        T::write_byte(self, address, value)
    }

    fn read_byte(&mut self, address: u32) -> Result<u8, Self::Error> {
        T::read_byte(self, address)
    }
}

/// Latch a command byte (CLE high).
pub fn latch_command<B: NandBus>(bus: &mut B, command: Command) -> Result<(), NandError<B::Error>> {
    bus.write_byte(NAND_DATA_ADDRESS | NAND_CLE_OFFSET, command as u8)
        .map_err(NandError::Bus)
}

/// Latch a sequence of address cycles (ALE high).
pub fn latch_address<B: NandBus>(bus: &mut B, cycles: &[u8]) -> Result<(), NandError<B::Error>> {
    for &cycle in cycles {
        bus.write_byte(NAND_DATA_ADDRESS | NAND_ALE_OFFSET, cycle)
            .map_err(NandError::Bus)?;
    }
    Ok(())
}

/// Stream data bytes out to the device.
pub fn write_data<B: NandBus>(bus: &mut B, data: &[u8]) -> Result<(), NandError<B::Error>> {
    for &byte in data {
        bus.write_byte(NAND_DATA_ADDRESS, byte)
            .map_err(NandError::Bus)?;
    }
    Ok(())
}

/// Stream data bytes in from the device.
pub fn read_data<B: NandBus>(bus: &mut B, buf: &mut [u8]) -> Result<(), NandError<B::Error>> {
    for byte in buf.iter_mut() {
        *byte = bus.read_byte(NAND_DATA_ADDRESS).map_err(NandError::Bus)?;
    }
    Ok(())
}

/// Read and decode the status register.
pub fn read_status<B: NandBus>(bus: &mut B) -> Result<Status, NandError<B::Error>> {
    latch_command(bus, Command::ReadStatus)?;
    let raw = bus
        .read_byte(NAND_DATA_ADDRESS)
        .map_err(NandError::Bus)?;
    Ok(Status::from_bits_truncate(raw))
}
