//! Error types and firmware status handling.
//!
//! Two failure classes reach the caller: the transport could not complete an
//! exchange ([`PortalError`]), or the exchange completed and the firmware
//! reported a non-OK status in the response header ([`FwStatus`]). Neither is
//! recovered locally — only the firmware knows the true object state, and
//! several commands are not idempotent, so retries belong to the caller.

use std::fmt;
use std::io;

use thiserror::Error;

/// Completion status carried in byte 2 of a response header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FwStatus {
    /// Command completed successfully.
    Ok = 0x0,
    /// Command accepted, not yet processed.
    Ready = 0x1,
    /// Authentication failed (stale or foreign token).
    AuthError = 0x3,
    /// Insufficient privilege.
    NoPrivilege = 0x4,
    /// DMA or I/O failure while the firmware accessed referenced memory.
    DmaError = 0x5,
    /// Invalid or conflicting configuration.
    ConfigError = 0x6,
    /// The firmware timed out internally.
    Timeout = 0x7,
    /// Out of hardware resources.
    NoResource = 0x8,
    /// Out of firmware memory.
    NoMemory = 0x9,
    /// The object is busy.
    Busy = 0xa,
    /// Operation not supported by this firmware revision.
    UnsupportedOp = 0xb,
    /// Operation invalid in the current object state.
    InvalidState = 0xc,
}

impl FwStatus {
    /// Decodes a raw status byte. Unknown values map to
    /// [`FwStatus::InvalidState`].
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x0 => FwStatus::Ok,
            0x1 => FwStatus::Ready,
            0x3 => FwStatus::AuthError,
            0x4 => FwStatus::NoPrivilege,
            0x5 => FwStatus::DmaError,
            0x6 => FwStatus::ConfigError,
            0x7 => FwStatus::Timeout,
            0x8 => FwStatus::NoResource,
            0x9 => FwStatus::NoMemory,
            0xa => FwStatus::Busy,
            0xb => FwStatus::UnsupportedOp,
            _ => FwStatus::InvalidState,
        }
    }

    /// Returns true if the status indicates success.
    pub fn is_success(&self) -> bool {
        *self == FwStatus::Ok
    }

    /// Converts to a result, attaching the failing opcode on error.
    pub fn into_result(self, opcode: u16) -> CmdResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(CmdError::Firmware {
                opcode,
                status: self,
            })
        }
    }
}

impl fmt::Display for FwStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FwStatus::Ok => "OK",
            FwStatus::Ready => "READY",
            FwStatus::AuthError => "AUTH_ERROR",
            FwStatus::NoPrivilege => "NO_PRIVILEGE",
            FwStatus::DmaError => "DMA_ERROR",
            FwStatus::ConfigError => "CONFIG_ERROR",
            FwStatus::Timeout => "TIMEOUT",
            FwStatus::NoResource => "NO_RESOURCE",
            FwStatus::NoMemory => "NO_MEMORY",
            FwStatus::Busy => "BUSY",
            FwStatus::UnsupportedOp => "UNSUPPORTED_OP",
            FwStatus::InvalidState => "INVALID_STATE",
        };
        write!(f, "{}", s)
    }
}

/// Failure of the raw command/response exchange itself.
///
/// A [`PortalError::Timeout`] means unknown outcome: the firmware may or may
/// not have applied the command. Mutating commands are not idempotent, so
/// blind resubmission can duplicate or corrupt remote state.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The command channel failed.
    #[error("command channel I/O failed: {0}")]
    Io(#[from] io::Error),

    /// No object with the requested id exists behind this portal.
    #[error("object not found")]
    NotFound,

    /// No response arrived in time; outcome unknown.
    #[error("exchange timed out")]
    Timeout,
}

/// Error returned by every command function.
#[derive(Debug, Error)]
pub enum CmdError {
    /// The exchange did not complete.
    #[error("transport failure: {0}")]
    Portal(#[from] PortalError),

    /// The exchange completed and the firmware rejected the command.
    #[error("firmware returned {status} for command 0x{opcode:04x}")]
    Firmware {
        /// Opcode of the rejected command, including the version nibble.
        opcode: u16,
        /// Reported completion status.
        status: FwStatus,
    },
}

impl CmdError {
    /// Returns the firmware status if this is a firmware rejection.
    pub fn fw_status(&self) -> Option<FwStatus> {
        match self {
            CmdError::Firmware { status, .. } => Some(*status),
            CmdError::Portal(_) => None,
        }
    }
}

/// Result type for command operations.
pub type CmdResult<T> = Result<T, CmdError>;
