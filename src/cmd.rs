//! ONFI command opcodes and status register decoding.

use bitflags::bitflags;

/// Bytes returned by READ ID at address 0x00.
pub const ID_BYTES: usize = 5;

/// ID the driver expects from the target device.
///
/// | Description       | Hex Data |
/// | ----------------- | -------- |
/// | Maker Code        | 0x2C     |
/// | Device Code       | 0x68     |
/// | Die/Cell Type     | 0x00     |
/// | Page/Block Size   | 0x27     |
/// | Plane/ECC Info    | 0xA9     |
pub const EXPECTED_DEVICE_ID: [u8; ID_BYTES] = [0x2C, 0x68, 0x00, 0x27, 0xA9];

/// READ ID address that returns the 4-byte "ONFI" signature.
pub const ONFI_SIGNATURE_ADDRESS: u8 = 0x20;

/// NAND command opcodes (ONFI mandatory command set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Reset = 0xFF,
    ReadId = 0x90,
    ReadParameterPage = 0xEC,
    ReadStatus = 0x70,
    ReadMode = 0x00,
    ReadConfirm = 0x30,
    PageProgram = 0x80,
    PageProgramConfirm = 0x10,
    EraseBlock = 0x60,
    EraseBlockConfirm = 0xD0,
}

/// Status register contents.
///
/// | Bit | Description          | Value                      |
/// | --- | -------------------- | -------------------------- |
/// | 0   | FAIL (last op)       | Pass: 0, Fail: 1           |
/// | 1   | FAILC (previous op)  | Pass: 0, Fail: 1           |
/// | 5   | ARDY (array ready)   | Ready: 1, Busy: 0          |
/// | 6   | RDY (device ready)   | Ready: 1, Busy: 0          |
/// | 7   | WP#                  | Not protected: 1           |
bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const FAIL = 0b0000_0001;
        const FAILC = 0b0000_0010;
        const ARRAY_READY = 0b0010_0000;
        const READY = 0b0100_0000;
        const NOT_PROTECTED = 0b1000_0000;
    }
}

impl Status {
    /// The last operation failed (either failure bit set).
    pub fn is_failed(&self) -> bool {
        self.intersects(Status::FAIL | Status::FAILC)
    }

    pub fn is_ready(&self) -> bool {
        self.contains(Status::READY)
    }

    /// Write protection is asserted.
    pub fn is_protected(&self) -> bool {
        !self.contains(Status::NOT_PROTECTED)
    }
}
