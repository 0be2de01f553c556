//! The transport boundary.
//!
//! The command channel is a black box offering exactly one operation: submit
//! a command buffer and block until a response buffer is available or the
//! exchange fails. Session allocation, DMA mapping and interrupt delivery
//! all live behind it.

use crate::cmd::Command;
use crate::error::PortalError;

/// One blocking command/response exchange with the firmware.
///
/// Implementations must not reorder responses relative to sequential
/// submissions on the same channel. Cancellation and timeouts are the
/// implementation's responsibility; a [`PortalError::Timeout`] leaves the
/// command outcome unknown.
pub trait McPortal {
    /// Submits `cmd` and returns the firmware's response buffer.
    ///
    /// The response carries the same command id; its header status byte is
    /// the completion status, which the caller of this trait (the command
    /// layer) inspects. An `Err` means the exchange itself failed and no
    /// status is available.
    fn exchange(&self, cmd: Command) -> Result<Command, PortalError>;
}

impl<P: McPortal + ?Sized> McPortal for &P {
    fn exchange(&self, cmd: Command) -> Result<Command, PortalError> {
        (**self).exchange(cmd)
    }
}
