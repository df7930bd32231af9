//! Behavioral NAND simulator used by the integration tests.
//!
//! One [`SimNand`] holds the chip state; the bus, pin and delay
//! adapters all share it through `Rc<RefCell<..>>` so the ready pin
//! and the delay provider observe the same simulated clock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use onfi_nand::address::{
    BAD_BLOCK_MARKER_COLUMN, PAGES_PER_BLOCK, TOTAL_BYTES_PER_PAGE,
};
use onfi_nand::bus::{NandBus, NAND_ALE_OFFSET, NAND_CLE_OFFSET, NAND_DATA_ADDRESS};
use onfi_nand::cmd::EXPECTED_DEVICE_ID;
use onfi_nand::onfi::{build_parameter_page, crc16, PARAMETER_PAGE_SIZE};

const ONFI_SIGNATURE_BYTES: [u8; 4] = *b"ONFI";

/// Simulated operation durations in nanoseconds.
const RESET_BUSY_NS: u64 = 300_000;
const READ_BUSY_NS: u64 = 70_000;
const PROGRAM_BUSY_NS: u64 = 600_000;
const ERASE_BUSY_NS: u64 = 3_000_000;

const STATUS_FAIL: u8 = 0x01;
const STATUS_ARDY: u8 = 0x20;
const STATUS_RDY: u8 = 0x40;
const STATUS_NOT_PROTECTED: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    IdAddress,
    IdStream,
    ParamAddress,
    ParamStream,
    ReadAddress,
    ReadStream,
    ProgramAddress,
    ProgramData,
    EraseAddress,
    StatusStream,
}

pub struct SimNand {
    pages: HashMap<(u8, u16, u16), Vec<u8>>,
    mode: Mode,
    cycles: Vec<u8>,
    stream: Vec<u8>,
    stream_pos: usize,
    program_target: (u8, u16, u16),
    program_column: usize,
    program_data: Vec<u8>,
    now_ns: u64,
    busy_until_ns: u64,
    last_op_failed: bool,
    wp_high: bool,

    // Fault injection knobs.
    pub id: [u8; 5],
    pub onfi_signature: [u8; 4],
    pub corrupt_param_copies: [bool; 3],
    pub wrong_geometry: bool,
    pub fail_program: bool,
    pub fail_erase: bool,
    pub force_busy: bool,
    pub force_protected: bool,

    // Delay accounting for the ready-wait tests.
    pub polls_5us: u32,
    pub yields_1ms: u32,
}

impl SimNand {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(SimNand {
            pages: HashMap::new(),
            mode: Mode::Idle,
            cycles: Vec::new(),
            stream: Vec::new(),
            stream_pos: 0,
            program_target: (0, 0, 0),
            program_column: 0,
            program_data: Vec::new(),
            now_ns: 0,
            busy_until_ns: 0,
            last_op_failed: false,
            wp_high: false,
            id: EXPECTED_DEVICE_ID,
            onfi_signature: ONFI_SIGNATURE_BYTES,
            corrupt_param_copies: [false; 3],
            wrong_geometry: false,
            fail_program: false,
            fail_erase: false,
            force_busy: false,
            force_protected: false,
            polls_5us: 0,
            yields_1ms: 0,
        }))
    }

    pub fn is_ready(&self) -> bool {
        !self.force_busy && self.now_ns >= self.busy_until_ns
    }

    /// Plant a factory bad-block marker.
    pub fn mark_factory_bad(&mut self, lun: u8, block: u16) {
        let page = self.page_mut(lun, block, 0);
        page[BAD_BLOCK_MARKER_COLUMN as usize] = 0x00;
    }

    /// Direct access to stored page content, for seeding corruption.
    pub fn page_mut(&mut self, lun: u8, block: u16, page: u16) -> &mut Vec<u8> {
        self.pages
            .entry((lun, block, page))
            .or_insert_with(|| vec![0xFF; TOTAL_BYTES_PER_PAGE])
    }

    pub fn page_bytes(&self, lun: u8, block: u16, page: u16, column: usize, len: usize) -> Vec<u8> {
        match self.pages.get(&(lun, block, page)) {
            Some(data) => data[column..column + len].to_vec(),
            None => vec![0xFF; len],
        }
    }

    fn command(&mut self, byte: u8) {
        match byte {
            0xFF => {
                self.mode = Mode::Idle;
                self.last_op_failed = false;
                self.busy_until_ns = self.now_ns + RESET_BUSY_NS;
            }
            0x90 => {
                self.mode = Mode::IdAddress;
            }
            0xEC => {
                self.mode = Mode::ParamAddress;
            }
            0x70 => {
                self.mode = Mode::StatusStream;
            }
            0x00 => {
                self.mode = Mode::ReadAddress;
                self.cycles.clear();
            }
            0x30 => {
                if self.mode == Mode::ReadAddress && self.cycles.len() == 5 {
                    let (lun, block, page) = row_from_cycles(&self.cycles[2..5]);
                    let column = column_from_cycles(&self.cycles[0..2]);
                    self.stream =
                        self.page_bytes(lun, block, page, column, TOTAL_BYTES_PER_PAGE - column);
                    self.stream_pos = 0;
                    self.mode = Mode::ReadStream;
                    self.busy_until_ns = self.now_ns + READ_BUSY_NS;
                } else {
                    self.mode = Mode::Idle;
                }
            }
            0x80 => {
                self.mode = Mode::ProgramAddress;
                self.cycles.clear();
                self.program_data.clear();
            }
            0x10 => {
                if self.mode == Mode::ProgramData {
                    self.commit_program();
                }
                self.mode = Mode::Idle;
                self.busy_until_ns = self.now_ns + PROGRAM_BUSY_NS;
            }
            0x60 => {
                self.mode = Mode::EraseAddress;
                self.cycles.clear();
            }
            0xD0 => {
                if self.mode == Mode::EraseAddress && self.cycles.len() == 3 {
                    self.commit_erase();
                }
                self.mode = Mode::Idle;
                self.busy_until_ns = self.now_ns + ERASE_BUSY_NS;
            }
            _ => {
                self.mode = Mode::Idle;
            }
        }
    }

    fn address(&mut self, byte: u8) {
        match self.mode {
            Mode::IdAddress => {
                self.stream = match byte {
                    0x00 => self.id.to_vec(),
                    0x20 => self.onfi_signature.to_vec(),
                    _ => vec![0x00; 8],
                };
                self.stream_pos = 0;
                self.mode = Mode::IdStream;
            }
            Mode::ParamAddress => {
                self.stream = self.parameter_pages();
                self.stream_pos = 0;
                self.mode = Mode::ParamStream;
                self.busy_until_ns = self.now_ns + READ_BUSY_NS;
            }
            Mode::ReadAddress | Mode::EraseAddress => {
                self.cycles.push(byte);
            }
            Mode::ProgramAddress => {
                self.cycles.push(byte);
                if self.cycles.len() == 5 {
                    self.program_target = row_from_cycles(&self.cycles[2..5]);
                    self.program_column = column_from_cycles(&self.cycles[0..2]);
                    self.mode = Mode::ProgramData;
                }
            }
            _ => {}
        }
    }

    fn data_write(&mut self, byte: u8) {
        if self.mode == Mode::ProgramData {
            self.program_data.push(byte);
        }
    }

    fn data_read(&mut self) -> u8 {
        match self.mode {
            Mode::StatusStream => self.status_byte(),
            Mode::IdStream | Mode::ParamStream | Mode::ReadStream => {
                let byte = self.stream.get(self.stream_pos).copied().unwrap_or(0x00);
                self.stream_pos += 1;
                byte
            }
            _ => 0x00,
        }
    }

    fn status_byte(&self) -> u8 {
        let mut status = 0u8;
        if self.is_ready() {
            status |= STATUS_RDY | STATUS_ARDY;
        }
        if self.last_op_failed {
            status |= STATUS_FAIL;
        }
        if self.wp_high && !self.force_protected {
            status |= STATUS_NOT_PROTECTED;
        }
        status
    }

    fn commit_program(&mut self) {
        let protected = !self.wp_high || self.force_protected;
        if protected || self.fail_program {
            self.last_op_failed = self.fail_program && !protected;
            return;
        }
        self.last_op_failed = false;
        let (lun, block, page) = self.program_target;
        let column = self.program_column;
        let incoming = core::mem::take(&mut self.program_data);
        let stored = self.page_mut(lun, block, page);
        for (offset, byte) in incoming.iter().enumerate() {
            // NAND programming can only clear bits.
            stored[column + offset] &= byte;
        }
    }

    fn commit_erase(&mut self) {
        let protected = !self.wp_high || self.force_protected;
        if protected || self.fail_erase {
            self.last_op_failed = self.fail_erase && !protected;
            return;
        }
        self.last_op_failed = false;
        let (lun, block, _) = row_from_cycles(&self.cycles[0..3]);
        for page in 0..PAGES_PER_BLOCK {
            self.pages.remove(&(lun, block, page));
        }
    }

    /// Three parameter-page copies back to back, with the configured
    /// corruption and geometry faults applied.
    fn parameter_pages(&self) -> Vec<u8> {
        let mut copy = build_parameter_page();
        if self.wrong_geometry {
            // Halve the claimed page size and refresh the CRC so the
            // copy still parses.
            copy[80..84].copy_from_slice(&4096u32.to_le_bytes());
            let crc = crc16(&copy[..254]);
            copy[254..256].copy_from_slice(&crc.to_le_bytes());
        }
        let mut stream = Vec::with_capacity(3 * PARAMETER_PAGE_SIZE);
        for corrupt in self.corrupt_param_copies {
            let mut this_copy = copy;
            if corrupt {
                this_copy[0] ^= 0xFF;
            }
            stream.extend_from_slice(&this_copy);
        }
        stream
    }
}

fn column_from_cycles(cycles: &[u8]) -> usize {
    cycles[0] as usize | ((cycles[1] as usize & 0x3F) << 8)
}

fn row_from_cycles(cycles: &[u8]) -> (u8, u16, u16) {
    let page = (cycles[0] & 0x7F) as u16;
    let block = ((cycles[0] >> 7) as u16)
        | ((cycles[1] as u16) << 1)
        | (((cycles[2] >> 1) as u16 & 0x07) << 9);
    let lun = cycles[2] & 0x01;
    (lun, block, page)
}

pub struct SimBus {
    pub sim: Rc<RefCell<SimNand>>,
}

impl NandBus for SimBus {
    type Error = Infallible;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Infallible> {
        let mut sim = self.sim.borrow_mut();
        if address & NAND_CLE_OFFSET != 0 {
            sim.command(value);
        } else if address & NAND_ALE_OFFSET != 0 {
            sim.address(value);
        } else {
            debug_assert_eq!(address, NAND_DATA_ADDRESS);
            sim.data_write(value);
        }
        Ok(())
    }

    fn read_byte(&mut self, address: u32) -> Result<u8, Infallible> {
        debug_assert_eq!(address, NAND_DATA_ADDRESS);
        Ok(self.sim.borrow_mut().data_read())
    }
}

pub struct SimReadyPin {
    pub sim: Rc<RefCell<SimNand>>,
}

impl ErrorType for SimReadyPin {
    type Error = Infallible;
}

impl InputPin for SimReadyPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.sim.borrow().is_ready())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.sim.borrow().is_ready())
    }
}

pub struct SimWpPin {
    pub sim: Rc<RefCell<SimNand>>,
}

impl ErrorType for SimWpPin {
    type Error = Infallible;
}

impl OutputPin for SimWpPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.sim.borrow_mut().wp_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.sim.borrow_mut().wp_high = true;
        Ok(())
    }
}

pub struct SimDelay {
    pub sim: Rc<RefCell<SimNand>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let mut sim = self.sim.borrow_mut();
        sim.now_ns += ns as u64;
        match ns {
            5_000 => sim.polls_5us += 1,
            1_000_000 => sim.yields_1ms += 1,
            _ => {}
        }
    }
}

/// A fully wired driver plus a handle to the underlying chip state.
pub fn build_driver(
    sim: Rc<RefCell<SimNand>>,
) -> onfi_nand::OnfiNand<SimBus, SimReadyPin, SimWpPin, SimDelay> {
    onfi_nand::OnfiNand::new(
        SimBus { sim: sim.clone() },
        SimReadyPin { sim: sim.clone() },
        SimWpPin { sim: sim.clone() },
        SimDelay { sim },
    )
}
