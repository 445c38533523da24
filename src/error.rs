//! Unified error types for the ThermoVac controller core.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! application loop handles failures uniformly.  All variants are `Copy`
//! so they can be handed across the interrupt boundary without allocation.
//!
//! Errors are classified by [`Error::recovery`]: the display transport is
//! the only fatal kind, and its recovery is a full pipeline reset followed
//! by the synchronous init sequence.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The character display transport failed.
    Display(DisplayError),
    /// The non-volatile store rejected or failed an operation.
    Storage(StorageError),
}

/// What the caller is expected to do after an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Nothing to do; the condition has already been accounted for.
    Ignore,
    /// Transient; the same operation may succeed on a later pass.
    RetryLater,
    /// Fatal for the display: reset the sequencer and re-run the init sequence.
    ReinitDisplay,
}

impl Error {
    /// Fatal errors are never retried in place.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Display(DisplayError::BusFault))
    }

    pub const fn recovery(&self) -> RecoveryAction {
        match self {
            Self::Display(DisplayError::BusFault) => RecoveryAction::ReinitDisplay,
            Self::Storage(StorageError::Busy) => RecoveryAction::RetryLater,
            Self::Storage(_) => RecoveryAction::Ignore,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display(e) => write!(f, "display: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Display errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// The bus reported a failed transfer. Fatal until the display is re-initialised.
    BusFault,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFault => write!(f, "bus transfer failed"),
        }
    }
}

impl core::error::Error for Error {}

impl core::error::Error for DisplayError {}

impl From<DisplayError> for Error {
    fn from(e: DisplayError) -> Self {
        Self::Display(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// A write is in flight or the device is still in its internal write cycle.
    Busy,
    /// The requested range runs past the device capacity.
    OutOfBounds,
    /// The payload does not fit the staging buffer.
    TooLarge,
    /// The bus reported a failed transfer.
    Bus,
    /// The device did not answer within the read timeout.
    Timeout,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "device busy"),
            Self::OutOfBounds => write!(f, "address out of bounds"),
            Self::TooLarge => write!(f, "payload too large"),
            Self::Bus => write!(f, "bus transfer failed"),
            Self::Timeout => write!(f, "device timeout"),
        }
    }
}

impl core::error::Error for StorageError {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
