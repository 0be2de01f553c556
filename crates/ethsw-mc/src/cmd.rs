//! The fixed-size command buffer and its header envelope.
//!
//! Every command and response is one 64-byte buffer: an 8-byte header word
//! followed by a 56-byte parameter region (seven 64-bit words). The header
//! carries the operation id, caller flags and the session token; parameter
//! layouts are per-opcode and live with their encoders in [`crate::api`].
//!
//! Header byte layout (within one little-endian 64-bit word):
//!
//! | bytes | field |
//! |-------|-------|
//! | 0     | source id (always 0) |
//! | 1     | hardware flags |
//! | 2     | status (READY on submit, completion status in the response) |
//! | 3     | software flags |
//! | 4..6  | session token |
//! | 6..8  | command id |

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FwStatus;
use crate::types::{MacAddr, Token};
use crate::wire::{self, IF_BITMAP_WORDS};

/// Size of the parameter region in bytes.
pub const CMD_PARAM_LEN: usize = 56;
/// Total buffer size: header word plus parameters.
pub const CMD_BUF_LEN: usize = 64;

const HDR_FLAGS_HW_OFF: u32 = 8;
const HDR_STATUS_OFF: u32 = 16;
const HDR_FLAGS_SW_OFF: u32 = 24;
const HDR_TOKEN_OFF: u32 = 32;
const HDR_CMDID_OFF: u32 = 48;

/// Caller-supplied command flags, opaque to this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CmdFlags(u32);

impl CmdFlags {
    /// No flags.
    pub const NONE: Self = CmdFlags(0);
    /// High-priority submission (hardware flag).
    pub const PRI: Self = CmdFlags(0x80);
    /// Poll for completion instead of raising an interrupt (software flag).
    pub const INTR_DIS: Self = CmdFlags(0x01);

    /// Wraps a raw flag mask.
    pub const fn from_raw(raw: u32) -> Self {
        CmdFlags(raw)
    }

    /// Returns the raw flag mask.
    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    fn contains(&self, other: CmdFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for CmdFlags {
    type Output = CmdFlags;

    fn bitor(self, rhs: CmdFlags) -> CmdFlags {
        CmdFlags(self.0 | rhs.0)
    }
}

/// Operation identifiers, versioned with a 4-bit revision nibble.
pub mod cmdid {
    const BASE_VERSION: u16 = 1;

    const fn id(raw: u16) -> u16 {
        (raw << 4) | BASE_VERSION
    }

    pub const CLOSE: u16 = id(0x800);
    pub const OPEN: u16 = id(0x802);

    pub const GET_API_VERSION: u16 = id(0xa02);

    pub const ENABLE: u16 = id(0x002);
    pub const DISABLE: u16 = id(0x003);
    pub const GET_ATTR: u16 = id(0x004);
    pub const RESET: u16 = id(0x005);

    pub const SET_IRQ_ENABLE: u16 = id(0x012);
    pub const SET_IRQ_MASK: u16 = id(0x014);
    pub const GET_IRQ_STATUS: u16 = id(0x016);
    pub const CLEAR_IRQ_STATUS: u16 = id(0x017);

    pub const IF_SET_TCI: u16 = id(0x030);
    pub const IF_SET_STP: u16 = id(0x031);
    pub const IF_GET_COUNTER: u16 = id(0x034);
    pub const IF_ENABLE: u16 = id(0x03d);
    pub const IF_DISABLE: u16 = id(0x03e);
    pub const IF_GET_ATTR: u16 = id(0x042);
    pub const IF_SET_MAX_FRAME_LENGTH: u16 = id(0x044);
    pub const IF_GET_LINK_STATE: u16 = id(0x046);
    pub const IF_SET_FLOODING: u16 = id(0x047);
    pub const IF_SET_BROADCAST: u16 = id(0x048);
    pub const IF_GET_TCI: u16 = id(0x04a);
    pub const IF_SET_LINK_CFG: u16 = id(0x04c);

    pub const VLAN_ADD: u16 = id(0x060);
    pub const VLAN_ADD_IF: u16 = id(0x061);
    pub const VLAN_ADD_IF_UNTAGGED: u16 = id(0x062);
    pub const VLAN_REMOVE_IF: u16 = id(0x064);
    pub const VLAN_REMOVE_IF_UNTAGGED: u16 = id(0x065);
    pub const VLAN_REMOVE: u16 = id(0x066);

    pub const FDB_ADD_UNICAST: u16 = id(0x084);
    pub const FDB_REMOVE_UNICAST: u16 = id(0x085);
    pub const FDB_ADD_MULTICAST: u16 = id(0x086);
    pub const FDB_REMOVE_MULTICAST: u16 = id(0x087);
    pub const FDB_SET_LEARNING_MODE: u16 = id(0x088);
    pub const FDB_DUMP: u16 = id(0x08a);

    pub const ACL_ADD: u16 = id(0x090);
    pub const ACL_REMOVE: u16 = id(0x091);
    pub const ACL_ADD_ENTRY: u16 = id(0x092);
    pub const ACL_ADD_IF: u16 = id(0x094);
    pub const ACL_REMOVE_IF: u16 = id(0x095);

    pub const IF_GET_PORT_MAC_ADDR: u16 = id(0x0a7);
    pub const IF_GET_PRIMARY_MAC_ADDR: u16 = id(0x0a8);
    pub const IF_SET_PRIMARY_MAC_ADDR: u16 = id(0x0a9);
}

/// One command or response buffer.
///
/// All multi-byte accessors read and write little-endian at fixed byte
/// offsets into the parameter region. Offsets are per-opcode constants owned
/// by the encoders; this type only guarantees the byte order and the
/// MAC/bitmap conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    header: u64,
    params: [u8; CMD_PARAM_LEN],
}

impl Command {
    /// Creates a command with an encoded header and zeroed parameters.
    ///
    /// The status byte is set to READY; the firmware overwrites it with the
    /// completion status in the response.
    pub fn new(cmd_id: u16, flags: CmdFlags, token: Token) -> Self {
        let mut header = 0u64;
        header = wire::pack_field(header, HDR_CMDID_OFF, 16, u64::from(cmd_id));
        header = wire::pack_field(header, HDR_TOKEN_OFF, 16, u64::from(token.as_raw()));
        header = wire::pack_field(header, HDR_STATUS_OFF, 8, u64::from(FwStatus::Ready as u8));
        if flags.contains(CmdFlags::PRI) {
            header = wire::pack_field(header, HDR_FLAGS_HW_OFF, 8, CmdFlags::PRI.0.into());
        }
        if flags.contains(CmdFlags::INTR_DIS) {
            header = wire::pack_field(header, HDR_FLAGS_SW_OFF, 8, CmdFlags::INTR_DIS.0.into());
        }
        Command {
            header,
            params: [0; CMD_PARAM_LEN],
        }
    }

    /// Command id from the header.
    pub fn cmd_id(&self) -> u16 {
        wire::unpack_field(self.header, HDR_CMDID_OFF, 16) as u16
    }

    /// Session token from the header.
    pub fn token(&self) -> Token {
        Token::from_raw(wire::unpack_field(self.header, HDR_TOKEN_OFF, 16) as u16)
    }

    /// Completion status from the header.
    pub fn status(&self) -> FwStatus {
        FwStatus::from_raw(wire::unpack_field(self.header, HDR_STATUS_OFF, 8) as u8)
    }

    /// Overwrites the header status byte. Used by the responding side.
    pub fn set_status(&mut self, status: FwStatus) {
        self.header = wire::pack_field(self.header, HDR_STATUS_OFF, 8, u64::from(status as u8));
    }

    /// Overwrites the header token. Used by the responding side of `open`.
    pub fn set_token(&mut self, token: Token) {
        self.header = wire::pack_field(self.header, HDR_TOKEN_OFF, 16, u64::from(token.as_raw()));
    }

    pub fn put_u8(&mut self, off: usize, v: u8) {
        self.params[off] = v;
    }

    pub fn put_u16(&mut self, off: usize, v: u16) {
        LittleEndian::write_u16(&mut self.params[off..off + 2], v);
    }

    pub fn put_u32(&mut self, off: usize, v: u32) {
        LittleEndian::write_u32(&mut self.params[off..off + 4], v);
    }

    pub fn put_u64(&mut self, off: usize, v: u64) {
        LittleEndian::write_u64(&mut self.params[off..off + 8], v);
    }

    pub fn get_u8(&self, off: usize) -> u8 {
        self.params[off]
    }

    pub fn get_u16(&self, off: usize) -> u16 {
        LittleEndian::read_u16(&self.params[off..off + 2])
    }

    pub fn get_u32(&self, off: usize) -> u32 {
        LittleEndian::read_u32(&self.params[off..off + 4])
    }

    pub fn get_u64(&self, off: usize) -> u64 {
        LittleEndian::read_u64(&self.params[off..off + 8])
    }

    /// Writes a MAC address at `off` in wire (reversed) byte order.
    pub fn put_mac(&mut self, off: usize, mac: &MacAddr) {
        self.params[off..off + 6].copy_from_slice(&wire::mac_to_wire(mac));
    }

    /// Reads a MAC address stored at `off` in wire byte order.
    pub fn get_mac(&self, off: usize) -> MacAddr {
        wire::mac_from_wire(&self.params[off..off + 6])
    }

    /// Writes an interface bitmap at `off` as four little-endian words.
    pub fn put_if_bitmap(&mut self, off: usize, bitmap: &[u64; IF_BITMAP_WORDS]) {
        for (i, word) in bitmap.iter().enumerate() {
            self.put_u64(off + i * 8, *word);
        }
    }

    /// Reads back an interface bitmap. Used by the responding side.
    pub fn get_if_bitmap(&self, off: usize) -> [u64; IF_BITMAP_WORDS] {
        let mut bitmap = [0u64; IF_BITMAP_WORDS];
        for (i, word) in bitmap.iter_mut().enumerate() {
            *word = self.get_u64(off + i * 8);
        }
        bitmap
    }

    /// Serializes the whole buffer, header first, little-endian.
    pub fn to_bytes(&self) -> [u8; CMD_BUF_LEN] {
        let mut buf = [0u8; CMD_BUF_LEN];
        LittleEndian::write_u64(&mut buf[..8], self.header);
        buf[8..].copy_from_slice(&self.params);
        buf
    }

    /// Reconstructs a buffer produced by [`Command::to_bytes`].
    pub fn from_bytes(buf: &[u8; CMD_BUF_LEN]) -> Self {
        let mut params = [0u8; CMD_PARAM_LEN];
        params.copy_from_slice(&buf[8..]);
        Command {
            header: LittleEndian::read_u64(&buf[..8]),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_token_roundtrip() {
        for raw in [0u16, 1, 0x00ff, 0xabcd, u16::MAX] {
            let cmd = Command::new(cmdid::ENABLE, CmdFlags::NONE, Token::from_raw(raw));
            assert_eq!(cmd.token().as_raw(), raw);
            assert_eq!(cmd.cmd_id(), cmdid::ENABLE);
        }
    }

    #[test]
    fn test_header_byte_positions() {
        let cmd = Command::new(cmdid::OPEN, CmdFlags::PRI | CmdFlags::INTR_DIS, Token::from_raw(0x1234));
        let bytes = cmd.to_bytes();
        assert_eq!(bytes[0], 0); // source id
        assert_eq!(bytes[1], 0x80); // hardware flags: PRI
        assert_eq!(bytes[2], FwStatus::Ready as u8);
        assert_eq!(bytes[3], 0x01); // software flags: INTR_DIS
        assert_eq!(&bytes[4..6], &[0x34, 0x12]); // token LE
        assert_eq!(&bytes[6..8], &[0x21, 0x80]); // OPEN = 0x802 << 4 | 1
    }

    #[test]
    fn test_cmdid_version_nibble() {
        assert_eq!(cmdid::OPEN, 0x8021);
        assert_eq!(cmdid::CLOSE, 0x8001);
        assert_eq!(cmdid::GET_API_VERSION, 0xa021);
        assert_eq!(cmdid::VLAN_ADD, 0x0601);
        assert_eq!(cmdid::FDB_DUMP, 0x08a1);
    }

    #[test]
    fn test_status_readback() {
        let mut cmd = Command::new(cmdid::RESET, CmdFlags::NONE, Token::from_raw(7));
        assert_eq!(cmd.status(), FwStatus::Ready);
        cmd.set_status(FwStatus::ConfigError);
        assert_eq!(cmd.status(), FwStatus::ConfigError);
    }

    #[test]
    fn test_param_accessors_little_endian() {
        let mut cmd = Command::new(cmdid::GET_ATTR, CmdFlags::NONE, Token::NONE);
        cmd.put_u16(0, 0x1122);
        cmd.put_u32(4, 0xa1b2_c3d4);
        cmd.put_u64(8, 0x0102_0304_0506_0708);
        let bytes = cmd.to_bytes();
        assert_eq!(&bytes[8..10], &[0x22, 0x11]);
        assert_eq!(&bytes[12..16], &[0xd4, 0xc3, 0xb2, 0xa1]);
        assert_eq!(&bytes[16..24], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(cmd.get_u16(0), 0x1122);
        assert_eq!(cmd.get_u32(4), 0xa1b2_c3d4);
        assert_eq!(cmd.get_u64(8), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_buffer_bytes_roundtrip() {
        let mut cmd = Command::new(cmdid::FDB_ADD_UNICAST, CmdFlags::PRI, Token::from_raw(0x55aa));
        cmd.put_u16(0, 3);
        cmd.put_mac(2, &"00:04:9f:00:00:01".parse().unwrap());
        let restored = Command::from_bytes(&cmd.to_bytes());
        assert_eq!(restored, cmd);
        assert_eq!(restored.get_mac(2).to_string(), "00:04:9f:00:00:01");
    }
}
