//! The driver proper: page/block operations composed from the bus
//! sequencer, ready/busy waiting and status interpretation.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::address::{
    NandAddress, BAD_BLOCK_MARKER_COLUMN, BLOCKS_PER_LUN, LUNS_PER_CE, TOTAL_BYTES_PER_PAGE,
};
use crate::bad_block::BadBlockTable;
use crate::bus::{self, NandBus};
use crate::cmd::{Command, EXPECTED_DEVICE_ID, ID_BYTES, ONFI_SIGNATURE_ADDRESS};
use crate::error::NandError;
use crate::onfi::{
    ParameterPage, ONFI_SIGNATURE, PARAMETER_PAGE_COPIES, PARAMETER_PAGE_SIZE,
};

/// Operation timeouts, device worst-case figures with margin.
pub const TIMEOUT_RESET_US: u32 = 5_000;
pub const TIMEOUT_READ_US: u32 = 1_000;
pub const TIMEOUT_PROGRAM_US: u32 = 5_000;
pub const TIMEOUT_ERASE_US: u32 = 50_000;

/// Busy-poll granularity while waiting for ready.
const POLL_INTERVAL_US: u32 = 5;
/// Spin at most this long before switching to cooperative yields.
const BUSY_POLL_LIMIT_US: u32 = 1_000;
/// Yield quantum once past the busy-poll window.
const YIELD_INTERVAL_MS: u32 = 1;
/// Blocks scanned between yields during the factory bad-block scan.
const SCAN_YIELD_INTERVAL: u16 = 32;

/// Raw ONFI NAND driver bound to one chip enable.
///
/// Collaborators: a [`NandBus`] for single-byte bus access, the
/// ready/busy input pin, the write-protect output pin (active low) and
/// a delay provider used both for poll spacing and cooperative yields.
///
/// The driver has no interior locking: callers must hold their own
/// lock across each whole operation. Every operation is attempted
/// exactly once; retry and bad-block policy stay with the caller.
pub struct OnfiNand<B, RB, WP, D> {
    bus: B,
    ready_busy: RB,
    write_protect: WP,
    delay: D,
    initialized: bool,
    bad_blocks: BadBlockTable,
}

impl<B, RB, WP, D> OnfiNand<B, RB, WP, D>
where
    B: NandBus,
    RB: InputPin,
    WP: OutputPin,
    D: DelayNs,
{
    pub fn new(bus: B, ready_busy: RB, write_protect: WP, delay: D) -> Self {
        OnfiNand {
            bus,
            ready_busy,
            write_protect,
            delay,
            initialized: false,
            bad_blocks: BadBlockTable::new(),
        }
    }

    /// Bring the device up: reset, verify identity and geometry, then
    /// scan the factory bad-block markers.
    pub fn initialize(&mut self) -> Result<(), NandError<B::Error>> {
        self.initialized = false;
        self.bad_blocks.clear();

        self.reset()?;

        let id = self.read_id()?;
        if id != EXPECTED_DEVICE_ID {
            warn!(
                "unexpected device id {:02x} {:02x} {:02x} {:02x} {:02x}",
                id[0], id[1], id[2], id[3], id[4]
            );
            return Err(NandError::HardwareFailure);
        }

        let mut signature = [0u8; ONFI_SIGNATURE.len()];
        self.read_id_at(ONFI_SIGNATURE_ADDRESS, &mut signature)?;
        if signature != ONFI_SIGNATURE {
            warn!("missing ONFI signature");
            return Err(NandError::HardwareFailure);
        }

        let params = self.read_parameter_page()?;
        if !params.matches_geometry() {
            warn!("parameter page geometry does not match this driver");
            return Err(NandError::HardwareFailure);
        }

        self.scan_factory_bad_blocks()?;

        self.initialized = true;
        info!(
            "NAND initialized, {} factory bad blocks",
            self.bad_blocks.len()
        );
        Ok(())
    }

    /// Issue RESET and wait for the device to come back.
    pub fn reset(&mut self) -> Result<(), NandError<B::Error>> {
        bus::latch_command(&mut self.bus, Command::Reset)?;
        wait_for_ready(&mut self.ready_busy, &mut self.delay, TIMEOUT_RESET_US)?;
        trace!("reset complete");
        Ok(())
    }

    /// Read the 5-byte device ID.
    pub fn read_id(&mut self) -> Result<[u8; ID_BYTES], NandError<B::Error>> {
        let mut id = [0u8; ID_BYTES];
        self.read_id_at(0x00, &mut id)?;
        Ok(id)
    }

    /// Read, validate and return the ONFI parameter page, trying each
    /// redundant copy in turn.
    pub fn read_parameter_page(&mut self) -> Result<ParameterPage, NandError<B::Error>> {
        self.ensure_ready()?;
        bus::latch_command(&mut self.bus, Command::ReadParameterPage)?;
        bus::latch_address(&mut self.bus, &[0x00])?;
        wait_for_ready(&mut self.ready_busy, &mut self.delay, TIMEOUT_READ_US)?;

        let mut copy = [0u8; PARAMETER_PAGE_SIZE];
        for attempt in 0..PARAMETER_PAGE_COPIES {
            bus::read_data(&mut self.bus, &mut copy)?;
            if let Some(page) = ParameterPage::parse(&copy) {
                trace!("parameter page copy {} valid", attempt);
                return Ok(page);
            }
            debug!("parameter page copy {} invalid", attempt);
        }
        Err(NandError::BadParameterPage)
    }

    /// Read `buf.len()` bytes from a page, starting at the addressed
    /// column.
    pub fn read_page(
        &mut self,
        address: NandAddress,
        buf: &mut [u8],
    ) -> Result<(), NandError<B::Error>> {
        self.ensure_initialized()?;
        self.read_page_raw(address, buf)
    }

    /// Program `buf` into a page starting at the addressed column.
    ///
    /// If the span covers the bad-block marker column the marker byte
    /// must stay 0xFF; anything else would destroy the defect map.
    pub fn program_page(
        &mut self,
        address: NandAddress,
        buf: &[u8],
    ) -> Result<(), NandError<B::Error>> {
        self.ensure_initialized()?;
        address.validate()?;
        let column = address.column as usize;
        if column + buf.len() > TOTAL_BYTES_PER_PAGE {
            return Err(NandError::InvalidParameter);
        }
        let marker = BAD_BLOCK_MARKER_COLUMN as usize;
        if column <= marker && marker < column + buf.len() && buf[marker - column] != 0xFF {
            return Err(NandError::InvalidParameter);
        }
        self.ensure_ready()?;

        let guard = WriteEnableGuard::acquire(&mut self.write_protect)?;
        bus::latch_command(&mut self.bus, Command::PageProgram)?;
        bus::latch_address(&mut self.bus, address.cycles().full())?;
        bus::write_data(&mut self.bus, buf)?;
        bus::latch_command(&mut self.bus, Command::PageProgramConfirm)?;
        wait_for_ready(&mut self.ready_busy, &mut self.delay, TIMEOUT_PROGRAM_US)?;
        let status = bus::read_status(&mut self.bus)?;
        drop(guard);

        if status.is_protected() {
            warn!("program blocked by write protection");
            return Err(NandError::WriteProtected);
        }
        if status.is_failed() {
            warn!(
                "program failed at lun {} block {} page {}",
                address.lun, address.block, address.page
            );
            return Err(NandError::ProgramFailed);
        }
        trace!("programmed {} bytes", buf.len());
        Ok(())
    }

    /// Erase one block.
    pub fn erase_block(&mut self, lun: u8, block: u16) -> Result<(), NandError<B::Error>> {
        self.ensure_initialized()?;
        let address = NandAddress::row(lun, block);
        address.validate()?;
        self.ensure_ready()?;

        let guard = WriteEnableGuard::acquire(&mut self.write_protect)?;
        bus::latch_command(&mut self.bus, Command::EraseBlock)?;
        bus::latch_address(&mut self.bus, address.cycles().rows())?;
        bus::latch_command(&mut self.bus, Command::EraseBlockConfirm)?;
        wait_for_ready(&mut self.ready_busy, &mut self.delay, TIMEOUT_ERASE_US)?;
        let status = bus::read_status(&mut self.bus)?;
        drop(guard);

        if status.is_protected() {
            warn!("erase blocked by write protection");
            return Err(NandError::WriteProtected);
        }
        if status.is_failed() {
            warn!("erase failed at lun {} block {}", lun, block);
            return Err(NandError::EraseFailed);
        }
        trace!("erased lun {} block {}", lun, block);
        Ok(())
    }

    /// Wait until the ready/busy pin reports ready, for callers
    /// recovering from a timeout. Busy-polls at 5 µs granularity;
    /// past the first millisecond it yields in 1 ms steps instead.
    pub fn wait_for_ready(&mut self, timeout_us: u32) -> Result<(), NandError<B::Error>> {
        wait_for_ready(&mut self.ready_busy, &mut self.delay, timeout_us)
    }

    /// Table lookup only; unmarked blocks are good.
    pub fn is_block_bad(&self, block: u16, lun: u8) -> bool {
        self.bad_blocks.contains(block, lun)
    }

    /// Record a block the caller has decided to retire. The driver
    /// never marks blocks on its own.
    pub fn mark_block_bad(&mut self, block: u16, lun: u8) -> Result<(), NandError<B::Error>> {
        debug!("marking lun {} block {} bad", lun, block);
        self.bad_blocks
            .insert(block, lun)
            .map_err(|_| NandError::HardwareFailure)
    }

    pub fn bad_block_count(&self) -> usize {
        self.bad_blocks.len()
    }

    /// Read without the initialization gate; used by `initialize()`
    /// itself for the factory scan.
    fn read_page_raw(
        &mut self,
        address: NandAddress,
        buf: &mut [u8],
    ) -> Result<(), NandError<B::Error>> {
        address.validate()?;
        if address.column as usize + buf.len() > TOTAL_BYTES_PER_PAGE {
            return Err(NandError::InvalidParameter);
        }
        self.ensure_ready()?;

        bus::latch_command(&mut self.bus, Command::ReadMode)?;
        bus::latch_address(&mut self.bus, address.cycles().full())?;
        bus::latch_command(&mut self.bus, Command::ReadConfirm)?;
        wait_for_ready(&mut self.ready_busy, &mut self.delay, TIMEOUT_READ_US)?;
        bus::read_data(&mut self.bus, buf)?;
        Ok(())
    }

    fn read_id_at(&mut self, address: u8, buf: &mut [u8]) -> Result<(), NandError<B::Error>> {
        self.ensure_ready()?;
        bus::latch_command(&mut self.bus, Command::ReadId)?;
        bus::latch_address(&mut self.bus, &[address])?;
        bus::read_data(&mut self.bus, buf)
    }

    /// Check the marker byte of the first page of every block in every
    /// LUN, yielding periodically so a long scan cannot starve other
    /// tasks.
    fn scan_factory_bad_blocks(&mut self) -> Result<(), NandError<B::Error>> {
        for lun in 0..LUNS_PER_CE {
            for block in 0..BLOCKS_PER_LUN {
                let mut marker = [0u8; 1];
                let address = NandAddress::new(lun, block, 0, BAD_BLOCK_MARKER_COLUMN);
                self.read_page_raw(address, &mut marker)?;
                if marker[0] != 0xFF {
                    debug!("factory bad block: lun {} block {}", lun, block);
                    self.bad_blocks
                        .insert(block, lun)
                        .map_err(|_| NandError::HardwareFailure)?;
                }
                if block % SCAN_YIELD_INTERVAL == SCAN_YIELD_INTERVAL - 1 {
                    self.delay.delay_ms(YIELD_INTERVAL_MS);
                }
            }
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), NandError<B::Error>> {
        if self.initialized {
            Ok(())
        } else {
            Err(NandError::NotInitialized)
        }
    }

    /// The device must be idle before a new command sequence starts.
    fn ensure_ready(&mut self) -> Result<(), NandError<B::Error>> {
        let ready = self
            .ready_busy
            .is_high()
            .map_err(|_| NandError::HardwareFailure)?;
        if ready {
            Ok(())
        } else {
            Err(NandError::DeviceBusy)
        }
    }
}

/// Scoped write-enable: deasserts WP# on acquisition and re-asserts it
/// on every exit path, success or error.
struct WriteEnableGuard<'a, WP: OutputPin> {
    pin: &'a mut WP,
}

impl<'a, WP: OutputPin> WriteEnableGuard<'a, WP> {
    fn acquire<BE>(pin: &'a mut WP) -> Result<Self, NandError<BE>> {
        pin.set_high().map_err(|_| NandError::HardwareFailure)?;
        Ok(WriteEnableGuard { pin })
    }
}

impl<WP: OutputPin> Drop for WriteEnableGuard<'_, WP> {
    fn drop(&mut self) {
        // Protection is restored even when the operation bails early.
        let _ = self.pin.set_low();
    }
}

/// Hybrid ready wait: busy-poll at [`POLL_INTERVAL_US`] granularity;
/// for timeouts above [`BUSY_POLL_LIMIT_US`] switch to cooperative
/// 1 ms yields once the poll window is spent.
fn wait_for_ready<RB, D, BE>(
    ready_busy: &mut RB,
    delay: &mut D,
    timeout_us: u32,
) -> Result<(), NandError<BE>>
where
    RB: InputPin,
    D: DelayNs,
{
    let mut elapsed_us = 0u32;
    loop {
        let ready = ready_busy
            .is_high()
            .map_err(|_| NandError::HardwareFailure)?;
        if ready {
            return Ok(());
        }
        if elapsed_us >= timeout_us {
            warn!("ready wait timed out after {} us", timeout_us);
            return Err(NandError::Timeout);
        }
        if timeout_us <= BUSY_POLL_LIMIT_US || elapsed_us < BUSY_POLL_LIMIT_US {
            delay.delay_us(POLL_INTERVAL_US);
            elapsed_us = elapsed_us.saturating_add(POLL_INTERVAL_US);
        } else {
            delay.delay_ms(YIELD_INTERVAL_MS);
            // Saturate so the bound check still fires for timeouts
            // near u32::MAX.
            elapsed_us = elapsed_us.saturating_add(YIELD_INTERVAL_MS * 1_000);
        }
    }
}
