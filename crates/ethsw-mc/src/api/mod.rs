//! The command set, grouped by object area.
//!
//! Every public operation follows the same shape: build a [`Command`],
//! submit it through the portal, check the response status, decode response
//! parameters. No operation keeps state between calls.

pub mod acl;
pub mod fdb;
pub mod interface;
pub mod irq;
pub mod object;
pub mod vlan;

use log::trace;

use crate::cmd::{CmdFlags, Command};
use crate::error::CmdResult;
use crate::portal::McPortal;

/// Command issuer for one switch object's control channel.
///
/// Holds the portal and the caller's command flags; everything else,
/// including the session token, is passed per call. One `SwitchCtrl` may
/// serve any number of sessions over the same portal.
pub struct SwitchCtrl<P: McPortal> {
    portal: P,
    flags: CmdFlags,
}

impl<P: McPortal> SwitchCtrl<P> {
    /// Creates an issuer with default (no) command flags.
    pub fn new(portal: P) -> Self {
        Self::with_flags(portal, CmdFlags::NONE)
    }

    /// Creates an issuer that stamps `flags` into every command header.
    pub fn with_flags(portal: P, flags: CmdFlags) -> Self {
        SwitchCtrl { portal, flags }
    }

    /// Command flags stamped into every header.
    pub fn flags(&self) -> CmdFlags {
        self.flags
    }

    /// Submits a command and returns the response after checking its
    /// completion status.
    pub(crate) fn submit(&self, cmd: Command) -> CmdResult<Command> {
        let opcode = cmd.cmd_id();
        trace!("submitting command 0x{:04x}", opcode);
        let rsp = self.portal.exchange(cmd)?;
        rsp.status().into_result(opcode)?;
        Ok(rsp)
    }
}
