/// Error type for the raw NAND driver.
///
/// Generic over the byte-bus error type `BE` so any
/// [`crate::bus::NandBus`] implementation can surface its own faults.
/// Every variant is locally non-fatal: the caller decides whether to
/// retry, mark the block bad, or escalate. The driver never retries on
/// its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NandError<BE> {
    /// Error from the byte bus collaborator.
    #[error("bus error: {0:?}")]
    Bus(BE),
    /// The device did not signal ready within the operation timeout.
    /// Hardware state is ambiguous afterwards; reset before reuse.
    #[error("timed out waiting for ready")]
    Timeout,
    /// An address field exceeds the device geometry.
    #[error("address out of bounds")]
    AddressOutOfBounds,
    /// The device was busy when the operation was issued.
    #[error("device busy")]
    DeviceBusy,
    /// The status register reported a program failure.
    #[error("program failed")]
    ProgramFailed,
    /// The status register reported an erase failure.
    #[error("erase failed")]
    EraseFailed,
    /// Write protection blocked the operation.
    #[error("write protected")]
    WriteProtected,
    /// A buffer or argument violates the operation's contract.
    #[error("invalid parameter")]
    InvalidParameter,
    /// `initialize()` has not completed successfully.
    #[error("driver not initialized")]
    NotInitialized,
    /// The device does not match expectations (ID, geometry, pins) or
    /// the bad-block table overflowed.
    #[error("hardware failure")]
    HardwareFailure,
    /// No redundant copy of the ONFI parameter page passed validation.
    #[error("bad parameter page")]
    BadParameterPage,
}
