//! VLAN management.
//!
//! Membership commands carry an interface bitmap and are atomic at the
//! firmware: if any listed interface violates the command's precondition
//! (already a member on add, not a member on remove, not yet a member for
//! the untagged variants), the entire command is rejected and nothing is
//! applied.

use crate::cmd::{cmdid, Command};
use crate::error::CmdResult;
use crate::portal::McPortal;
use crate::types::Token;
use crate::wire::build_if_id_bitmap;

use super::SwitchCtrl;

// vlan_add
const VLAN_ADD_FDB_ID_OFF: usize = 0;
const VLAN_ADD_VLAN_ID_OFF: usize = 2;

// membership commands and vlan_remove: vlan id sits in the second half-word
const VLAN_ID_OFF: usize = 2;
const VLAN_IF_BITMAP_OFF: usize = 8;

impl<P: McPortal> SwitchCtrl<P> {
    /// Creates VLAN `vlan_id` backed by forwarding database `fdb_id`.
    ///
    /// Valid ids exclude 0x000 and 0xfff. Adding a duplicate id fails at the
    /// firmware. Sharing one `fdb_id` across VLANs yields shared learning.
    pub fn vlan_add(&self, token: Token, vlan_id: u16, fdb_id: u16) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::VLAN_ADD, self.flags(), token);
        cmd.put_u16(VLAN_ADD_FDB_ID_OFF, fdb_id);
        cmd.put_u16(VLAN_ADD_VLAN_ID_OFF, vlan_id);
        self.submit(cmd)?;
        Ok(())
    }

    /// Adds `if_ids` to the egress list of VLAN `vlan_id`. All listed
    /// interfaces must not yet be members.
    pub fn vlan_add_if(&self, token: Token, vlan_id: u16, if_ids: &[u16]) -> CmdResult<()> {
        self.vlan_manage_if(cmdid::VLAN_ADD_IF, token, vlan_id, if_ids)
    }

    /// Marks `if_ids` to transmit untagged on VLAN `vlan_id`. All listed
    /// interfaces must already be members and still transmit tagged.
    pub fn vlan_add_if_untagged(
        &self,
        token: Token,
        vlan_id: u16,
        if_ids: &[u16],
    ) -> CmdResult<()> {
        self.vlan_manage_if(cmdid::VLAN_ADD_IF_UNTAGGED, token, vlan_id, if_ids)
    }

    /// Removes `if_ids` from VLAN `vlan_id`. All listed interfaces must be
    /// members.
    pub fn vlan_remove_if(&self, token: Token, vlan_id: u16, if_ids: &[u16]) -> CmdResult<()> {
        self.vlan_manage_if(cmdid::VLAN_REMOVE_IF, token, vlan_id, if_ids)
    }

    /// Reverts `if_ids` to tagged transmission on VLAN `vlan_id`. All listed
    /// interfaces must currently be configured untagged.
    pub fn vlan_remove_if_untagged(
        &self,
        token: Token,
        vlan_id: u16,
        if_ids: &[u16],
    ) -> CmdResult<()> {
        self.vlan_manage_if(cmdid::VLAN_REMOVE_IF_UNTAGGED, token, vlan_id, if_ids)
    }

    /// Deletes VLAN `vlan_id` and implicitly all of its membership.
    pub fn vlan_remove(&self, token: Token, vlan_id: u16) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::VLAN_REMOVE, self.flags(), token);
        cmd.put_u16(VLAN_ID_OFF, vlan_id);
        self.submit(cmd)?;
        Ok(())
    }

    fn vlan_manage_if(
        &self,
        cmd_id: u16,
        token: Token,
        vlan_id: u16,
        if_ids: &[u16],
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmd_id, self.flags(), token);
        cmd.put_u16(VLAN_ID_OFF, vlan_id);
        cmd.put_if_bitmap(VLAN_IF_BITMAP_OFF, &build_if_id_bitmap(if_ids, if_ids.len()));
        self.submit(cmd)?;
        Ok(())
    }
}
