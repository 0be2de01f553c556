//! Object lifecycle: sessions, enable/disable/reset, attribute and version
//! queries.

use log::debug;

use crate::cmd::{cmdid, Command};
use crate::error::CmdResult;
use crate::portal::McPortal;
use crate::types::{ApiVersion, ComponentType, SwitchAttributes, Token};
use crate::wire::unpack_field;

use super::SwitchCtrl;

// open
const OPEN_OBJECT_ID_OFF: usize = 0;

// get_attributes response
const ATTR_NUM_IFS_OFF: usize = 0;
const ATTR_MAX_FDBS_OFF: usize = 2;
const ATTR_NUM_FDBS_OFF: usize = 3;
const ATTR_MAX_VLANS_OFF: usize = 4;
const ATTR_NUM_VLANS_OFF: usize = 6;
const ATTR_MAX_FDB_ENTRIES_OFF: usize = 8;
const ATTR_FDB_AGING_TIME_OFF: usize = 10;
const ATTR_OBJECT_ID_OFF: usize = 12;
const ATTR_MEM_SIZE_OFF: usize = 16;
const ATTR_MAX_FDB_MC_GROUPS_OFF: usize = 18;
const ATTR_MAX_METERS_PER_IF_OFF: usize = 20;
const ATTR_COMPONENT_TYPE_OFF: usize = 21;
const ATTR_OPTIONS_OFF: usize = 24;

const COMPONENT_TYPE_SHIFT: u32 = 0;
const COMPONENT_TYPE_WIDTH: u32 = 4;

// get_api_version response
const VER_MAJOR_OFF: usize = 0;
const VER_MINOR_OFF: usize = 2;

impl<P: McPortal> SwitchCtrl<P> {
    /// Opens a control session for the object with id `object_id`.
    ///
    /// The object itself is created by a provisioning layer; this only
    /// authenticates against an existing one. The returned token must
    /// accompany every subsequent command for this object.
    ///
    /// # Errors
    ///
    /// [`PortalError::NotFound`](crate::PortalError::NotFound) if no such
    /// object exists behind the portal.
    pub fn open(&self, object_id: u32) -> CmdResult<Token> {
        let mut cmd = Command::new(cmdid::OPEN, self.flags(), Token::NONE);
        cmd.put_u32(OPEN_OBJECT_ID_OFF, object_id);

        let rsp = self.submit(cmd)?;
        let token = rsp.token();
        debug!("opened switch object {} as {:?}", object_id, token);
        Ok(token)
    }

    /// Closes the session. Subsequent commands with this token fail at the
    /// firmware, not locally.
    pub fn close(&self, token: Token) -> CmdResult<()> {
        self.submit(Command::new(cmdid::CLOSE, self.flags(), token))?;
        Ok(())
    }

    /// Enables switch functionality.
    pub fn enable(&self, token: Token) -> CmdResult<()> {
        self.submit(Command::new(cmdid::ENABLE, self.flags(), token))?;
        Ok(())
    }

    /// Disables switch functionality.
    pub fn disable(&self, token: Token) -> CmdResult<()> {
        self.submit(Command::new(cmdid::DISABLE, self.flags(), token))?;
        Ok(())
    }

    /// Restores the firmware-side default configuration. VLANs, FDB contents
    /// and ACLs are cleared; the session token stays valid.
    pub fn reset(&self, token: Token) -> CmdResult<()> {
        self.submit(Command::new(cmdid::RESET, self.flags(), token))?;
        Ok(())
    }

    /// Retrieves the switch object's attribute snapshot. Safe to call
    /// regardless of enabled state.
    pub fn get_attributes(&self, token: Token) -> CmdResult<SwitchAttributes> {
        let rsp = self.submit(Command::new(cmdid::GET_ATTR, self.flags(), token))?;

        Ok(SwitchAttributes {
            num_ifs: rsp.get_u16(ATTR_NUM_IFS_OFF),
            max_fdbs: rsp.get_u8(ATTR_MAX_FDBS_OFF),
            num_fdbs: rsp.get_u8(ATTR_NUM_FDBS_OFF),
            max_vlans: rsp.get_u16(ATTR_MAX_VLANS_OFF),
            num_vlans: rsp.get_u16(ATTR_NUM_VLANS_OFF),
            max_fdb_entries: rsp.get_u16(ATTR_MAX_FDB_ENTRIES_OFF),
            fdb_aging_time: rsp.get_u16(ATTR_FDB_AGING_TIME_OFF),
            id: rsp.get_u32(ATTR_OBJECT_ID_OFF),
            mem_size: rsp.get_u16(ATTR_MEM_SIZE_OFF),
            max_fdb_mc_groups: rsp.get_u16(ATTR_MAX_FDB_MC_GROUPS_OFF),
            max_meters_per_if: rsp.get_u8(ATTR_MAX_METERS_PER_IF_OFF),
            options: rsp.get_u64(ATTR_OPTIONS_OFF),
            component_type: ComponentType::from_wire(unpack_field(
                rsp.get_u8(ATTR_COMPONENT_TYPE_OFF).into(),
                COMPONENT_TYPE_SHIFT,
                COMPONENT_TYPE_WIDTH,
            )),
        })
    }

    /// Reports the firmware's protocol version, for capability negotiation
    /// before issuing version-sensitive commands. Takes no token.
    pub fn get_api_version(&self) -> CmdResult<ApiVersion> {
        let rsp = self.submit(Command::new(
            cmdid::GET_API_VERSION,
            self.flags(),
            Token::NONE,
        ))?;
        Ok(ApiVersion {
            major: rsp.get_u16(VER_MAJOR_OFF),
            minor: rsp.get_u16(VER_MINOR_OFF),
        })
    }
}
