//! ACL management.
//!
//! Adding an entry is a two-phase protocol: [`prepare_entry_key`] serializes
//! the match/mask key locally into a fixed 256-byte buffer, the caller
//! places those bytes in firmware-accessible memory, and
//! [`SwitchCtrl::acl_add_entry`] then references that memory by address. The
//! prepared-key type makes the ordering explicit: there is no way to obtain
//! the buffer contents except through the preparation step.

use byteorder::{ByteOrder, LittleEndian};

use crate::cmd::{cmdid, Command};
use crate::error::CmdResult;
use crate::portal::McPortal;
use crate::types::{AclEntryCfg, AclFields, AclKey, Token};
use crate::wire::{build_if_id_bitmap, mac_to_wire, pack_field};

use super::SwitchCtrl;

// acl_add
const ACL_ADD_MAX_ENTRIES_OFF: usize = 2;
const ACL_ADD_RSP_ACL_ID_OFF: usize = 0;

// acl_remove and interface association
const ACL_ID_OFF: usize = 0;
const ACL_IF_NUM_IFS_OFF: usize = 2;
const ACL_IF_BITMAP_OFF: usize = 8;

// acl_add_entry
const ENTRY_ACL_ID_OFF: usize = 0;
const ENTRY_RESULT_IF_ID_OFF: usize = 2;
const ENTRY_PRECEDENCE_OFF: usize = 4;
const ENTRY_RESULT_ACTION_OFF: usize = 8;
const ENTRY_KEY_IOVA_OFF: usize = 48;

const RESULT_ACTION_SHIFT: u32 = 0;
const RESULT_ACTION_WIDTH: u32 = 4;

/// Size of the serialized key buffer referenced by `acl_add_entry`.
pub const ACL_KEY_BUF_LEN: usize = 256;

// Field offsets within one half (match or mask) of the key buffer.
const KEY_L2_DEST_MAC_OFF: usize = 0;
const KEY_L2_TPID_OFF: usize = 6;
const KEY_L2_SOURCE_MAC_OFF: usize = 8;
const KEY_L2_VLAN_ID_OFF: usize = 14;
const KEY_L3_DEST_IP_OFF: usize = 16;
const KEY_L3_SOURCE_IP_OFF: usize = 20;
const KEY_L4_DEST_PORT_OFF: usize = 24;
const KEY_L4_SOURCE_PORT_OFF: usize = 26;
const KEY_L2_ETHER_TYPE_OFF: usize = 28;
const KEY_L2_PCP_DEI_OFF: usize = 30;
const KEY_L3_DSCP_OFF: usize = 31;
const KEY_L3_PROTOCOL_OFF: usize = 44;
const KEY_FRAME_FLAGS_OFF: usize = 45;

/// Offset of the mask half within the key buffer.
const KEY_MASK_BLOCK_OFF: usize = 48;

/// A match/mask key serialized into the exact buffer layout the firmware
/// expects.
///
/// Produced only by [`prepare_entry_key`]; the caller copies
/// [`as_bytes`](PreparedAclKey::as_bytes) into firmware-accessible memory
/// and passes that memory's address in [`AclEntryCfg::key_iova`]. The
/// memory must remain valid until the add-entry command completes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PreparedAclKey([u8; ACL_KEY_BUF_LEN]);

impl PreparedAclKey {
    /// The serialized buffer contents.
    pub fn as_bytes(&self) -> &[u8; ACL_KEY_BUF_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for PreparedAclKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PreparedAclKey({} bytes)", ACL_KEY_BUF_LEN)
    }
}

/// Serializes an ACL match/mask key.
///
/// Pure and deterministic: no transport round-trip, and identical keys
/// produce byte-identical buffers. MAC fields are stored in wire (reversed)
/// order, multi-byte numerics little-endian; bytes past the two field
/// blocks stay zero.
pub fn prepare_entry_key(key: &AclKey) -> PreparedAclKey {
    let mut buf = [0u8; ACL_KEY_BUF_LEN];
    write_fields(&mut buf[..KEY_MASK_BLOCK_OFF], &key.match_fields);
    write_fields(
        &mut buf[KEY_MASK_BLOCK_OFF..2 * KEY_MASK_BLOCK_OFF],
        &key.mask,
    );
    PreparedAclKey(buf)
}

fn write_fields(block: &mut [u8], fields: &AclFields) {
    block[KEY_L2_DEST_MAC_OFF..KEY_L2_DEST_MAC_OFF + 6]
        .copy_from_slice(&mac_to_wire(&fields.l2_dest_mac));
    LittleEndian::write_u16(&mut block[KEY_L2_TPID_OFF..], fields.l2_tpid);
    block[KEY_L2_SOURCE_MAC_OFF..KEY_L2_SOURCE_MAC_OFF + 6]
        .copy_from_slice(&mac_to_wire(&fields.l2_source_mac));
    LittleEndian::write_u16(&mut block[KEY_L2_VLAN_ID_OFF..], fields.l2_vlan_id);
    LittleEndian::write_u32(&mut block[KEY_L3_DEST_IP_OFF..], fields.l3_dest_ip);
    LittleEndian::write_u32(&mut block[KEY_L3_SOURCE_IP_OFF..], fields.l3_source_ip);
    LittleEndian::write_u16(&mut block[KEY_L4_DEST_PORT_OFF..], fields.l4_dest_port);
    LittleEndian::write_u16(&mut block[KEY_L4_SOURCE_PORT_OFF..], fields.l4_source_port);
    LittleEndian::write_u16(&mut block[KEY_L2_ETHER_TYPE_OFF..], fields.l2_ether_type);
    block[KEY_L2_PCP_DEI_OFF] = fields.l2_pcp_dei;
    block[KEY_L3_DSCP_OFF] = fields.l3_dscp;
    block[KEY_L3_PROTOCOL_OFF] = fields.l3_protocol;
    block[KEY_FRAME_FLAGS_OFF] = fields.frame_flags;
}

impl<P: McPortal> SwitchCtrl<P> {
    /// Creates an ACL with capacity for `max_entries` rules and returns its
    /// id. Multiple ACLs can coexist on one switch.
    pub fn acl_add(&self, token: Token, max_entries: u16) -> CmdResult<u16> {
        let mut cmd = Command::new(cmdid::ACL_ADD, self.flags(), token);
        cmd.put_u16(ACL_ADD_MAX_ENTRIES_OFF, max_entries);
        let rsp = self.submit(cmd)?;
        Ok(rsp.get_u16(ACL_ADD_RSP_ACL_ID_OFF))
    }

    /// Removes ACL `acl_id`.
    pub fn acl_remove(&self, token: Token, acl_id: u16) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::ACL_REMOVE, self.flags(), token);
        cmd.put_u16(ACL_ID_OFF, acl_id);
        self.submit(cmd)?;
        Ok(())
    }

    /// Associates `if_ids` with ACL `acl_id`; frames ingressing on a member
    /// interface are matched against the ACL.
    pub fn acl_add_if(&self, token: Token, acl_id: u16, if_ids: &[u16]) -> CmdResult<()> {
        self.acl_manage_if(cmdid::ACL_ADD_IF, token, acl_id, if_ids)
    }

    /// Dissociates `if_ids` from ACL `acl_id`.
    pub fn acl_remove_if(&self, token: Token, acl_id: u16, if_ids: &[u16]) -> CmdResult<()> {
        self.acl_manage_if(cmdid::ACL_REMOVE_IF, token, acl_id, if_ids)
    }

    fn acl_manage_if(
        &self,
        cmd_id: u16,
        token: Token,
        acl_id: u16,
        if_ids: &[u16],
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmd_id, self.flags(), token);
        cmd.put_u16(ACL_ID_OFF, acl_id);
        cmd.put_u16(ACL_IF_NUM_IFS_OFF, if_ids.len() as u16);
        cmd.put_if_bitmap(ACL_IF_BITMAP_OFF, &build_if_id_bitmap(if_ids, if_ids.len()));
        self.submit(cmd)?;
        Ok(())
    }

    /// Adds a prioritized entry to ACL `acl_id`.
    ///
    /// `cfg.key_iova` must address memory filled from a
    /// [`PreparedAclKey`] and still be firmware-accessible when the command
    /// is processed. Precedence values must be unique within the ACL; a
    /// collision is rejected by the firmware.
    pub fn acl_add_entry(&self, token: Token, acl_id: u16, cfg: &AclEntryCfg) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::ACL_ADD_ENTRY, self.flags(), token);
        cmd.put_u16(ENTRY_ACL_ID_OFF, acl_id);
        cmd.put_u16(ENTRY_RESULT_IF_ID_OFF, cfg.result.if_id);
        cmd.put_u32(ENTRY_PRECEDENCE_OFF, cfg.precedence);
        cmd.put_u8(
            ENTRY_RESULT_ACTION_OFF,
            pack_field(
                0,
                RESULT_ACTION_SHIFT,
                RESULT_ACTION_WIDTH,
                cfg.result.action.to_wire(),
            ) as u8,
        );
        cmd.put_u64(ENTRY_KEY_IOVA_OFF, cfg.key_iova);
        self.submit(cmd)?;
        Ok(())
    }
}
