//! Domain types exchanged with the switch object.
//!
//! Everything here is plain data: attribute snapshots, per-interface
//! configuration, and the enums whose numeric values are wire contracts with
//! the firmware. Conversion to and from wire encodings lives next to the
//! command encoders; the `to_wire`/`from_wire` helpers on enums exist so the
//! numeric mapping is written down exactly once.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Authentication token of an open control session.
///
/// Returned by `open` and required by every subsequent command for the same
/// object. The value is opaque; callers only store and pass it back.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Token(u16);

impl Token {
    /// Token used by commands issued outside a session (`open`,
    /// `get_api_version`).
    pub const NONE: Self = Token(0);

    /// Wraps a raw token value.
    pub const fn from_raw(raw: u16) -> Self {
        Token(raw)
    }

    /// Returns the raw token value.
    pub const fn as_raw(&self) -> u16 {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(0x{:04x})", self.0)
    }
}

/// A MAC address in canonical (most-significant byte first) order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// The all-zero address. Marks logical end-of-data in FDB dumps.
    pub const ZERO: Self = MacAddr([0; 6]);

    /// Creates an address from canonical-order octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }

    /// Returns the canonical-order octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Returns true for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Returns true for group (multicast/broadcast) addresses.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

/// Error parsing a MAC address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid MAC address '{input}'")]
pub struct MacParseError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| MacParseError {
                input: s.to_string(),
            })?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| MacParseError {
                input: s.to_string(),
            })?;
        }
        if parts.next().is_some() {
            return Err(MacParseError {
                input: s.to_string(),
            });
        }
        Ok(MacAddr(octets))
    }
}

// ============================================================================
// Switch object
// ============================================================================

/// Feature-option bits reported in [`SwitchAttributes::options`].
pub mod switch_opt {
    /// Flooding disabled.
    pub const FLOODING_DIS: u64 = 0x0000_0000_0000_0001;
    /// Multicast disabled.
    pub const MULTICAST_DIS: u64 = 0x0000_0000_0000_0004;
    /// Control interface disabled.
    pub const CTRL_IF_DIS: u64 = 0x0000_0000_0000_0010;
    /// Flooding metering disabled.
    pub const FLOODING_METERING_DIS: u64 = 0x0000_0000_0000_0020;
    /// Metering enabled.
    pub const METERING_EN: u64 = 0x0000_0000_0000_0040;
}

/// Bridge component type of the switch object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentType {
    /// C-VLAN component, processing C-tagged frames.
    #[default]
    CVlan,
    /// S-VLAN component of a provider bridge.
    SVlan,
}

impl ComponentType {
    pub(crate) fn from_wire(raw: u64) -> Self {
        match raw {
            1 => ComponentType::SVlan,
            _ => ComponentType::CVlan,
        }
    }
}

/// Read-only snapshot of the switch object, refreshed only by an explicit
/// `get_attributes` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwitchAttributes {
    /// Object id the session was opened against.
    pub id: u32,
    /// Feature-option bitmask; see [`switch_opt`].
    pub options: u64,
    /// Maximum number of VLANs.
    pub max_vlans: u16,
    /// Meters available per interface.
    pub max_meters_per_if: u8,
    /// Maximum number of forwarding databases.
    pub max_fdbs: u8,
    /// FDB entry capacity; 0 means the firmware default.
    pub max_fdb_entries: u16,
    /// Dynamic-entry aging time in seconds; 0 means the firmware default.
    pub fdb_aging_time: u16,
    /// Multicast groups per FDB; 0 means the firmware default.
    pub max_fdb_mc_groups: u16,
    /// Number of interfaces on this object.
    pub num_ifs: u16,
    /// Frame storage memory size.
    pub mem_size: u16,
    /// Current number of VLANs.
    pub num_vlans: u16,
    /// Current number of FDBs.
    pub num_fdbs: u8,
    /// Bridge component type.
    pub component_type: ComponentType,
}

/// Protocol version reported by `get_api_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

// ============================================================================
// Interrupts
// ============================================================================

/// Interrupt line signalling interface state changes.
pub const IRQ_INDEX_IF: u8 = 0x00;
/// Interrupt line for switch-global events.
pub const IRQ_INDEX_L2SW: u8 = 0x01;

/// Cause bit on [`IRQ_INDEX_IF`]: link state changed.
pub const IRQ_EVENT_LINK_CHANGED: u32 = 0x0001;

// ============================================================================
// Interfaces
// ============================================================================

/// Link-option bits carried in [`LinkCfg::options`] and
/// [`LinkState::options`].
pub mod link_opt {
    /// Auto-negotiation enabled.
    pub const AUTONEG: u64 = 0x0000_0000_0000_0001;
    /// Half-duplex mode.
    pub const HALF_DUPLEX: u64 = 0x0000_0000_0000_0002;
    /// Pause frames enabled.
    pub const PAUSE: u64 = 0x0000_0000_0000_0004;
    /// Asymmetric pause frames enabled.
    pub const ASYM_PAUSE: u64 = 0x0000_0000_0000_0008;
}

/// Requested link configuration for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkCfg {
    /// Rate in Mbps.
    pub rate: u32,
    /// Bitmask of [`link_opt`] values.
    pub options: u64,
}

/// Observed link state of one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkState {
    /// Rate in Mbps.
    pub rate: u32,
    /// Bitmask of [`link_opt`] values.
    pub options: u64,
    /// False covers both down and disconnected.
    pub up: bool,
}

/// Default VLAN tag control information for one interface.
///
/// Serialized into a single 16-bit field: VLAN id in bits 0..12, drop
/// eligibility in bit 12, priority in bits 13..16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TciCfg {
    /// Priority code point, 3 bits.
    pub pcp: u8,
    /// Drop eligibility indicator.
    pub dei: bool,
    /// VLAN id, 12 bits; 0x000 and 0xfff are reserved by IEEE 802.1Q.
    pub vlan_id: u16,
}

/// Spanning-tree state of an interface within one VLAN.
///
/// `Blocking` and `Disabled` share wire value 0 — an inherited artifact of
/// the encoding. Both variants are kept so caller intent survives in logs,
/// but the firmware cannot tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StpState {
    Disabled,
    Listening,
    Learning,
    Forwarding,
    Blocking,
}

impl StpState {
    pub(crate) fn to_wire(self) -> u64 {
        match self {
            StpState::Disabled | StpState::Blocking => 0,
            StpState::Listening => 1,
            StpState::Learning => 2,
            StpState::Forwarding => 3,
        }
    }
}

/// Which frames an interface admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameAdmission {
    /// Tagged, untagged and priority-tagged frames are accepted.
    #[default]
    All,
    /// Untagged and priority-tagged frames are discarded.
    OnlyVlanTagged,
}

impl FrameAdmission {
    pub(crate) fn from_wire(raw: u64) -> Self {
        match raw {
            3 => FrameAdmission::OnlyVlanTagged,
            _ => FrameAdmission::All,
        }
    }
}

/// Attribute snapshot of one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IfAttributes {
    /// Number of traffic classes.
    pub num_tcs: u8,
    /// Transmit rate in Mbps.
    pub rate: u32,
    /// Interface configuration option bitmap.
    pub options: u32,
    /// Interface enabled.
    pub enabled: bool,
    /// Frames for VLANs not containing this interface are accepted.
    pub accept_all_vlan: bool,
    /// Admission policy for untagged frames.
    pub admit_untagged: FrameAdmission,
    /// Control-frame transmit queue id.
    pub qdid: u16,
}

/// Per-interface counter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterType {
    IngFrame,
    IngByte,
    IngFltrFrame,
    IngFrameDiscard,
    IngMcastFrame,
    IngMcastByte,
    IngBcastFrame,
    IngBcastBytes,
    EgrFrame,
    EgrByte,
    EgrFrameDiscard,
    EgrStpFrameDiscard,
    IngNoBufferDiscard,
}

impl CounterType {
    pub(crate) fn to_wire(self) -> u64 {
        match self {
            CounterType::IngFrame => 0x0,
            CounterType::IngByte => 0x1,
            CounterType::IngFltrFrame => 0x2,
            CounterType::IngFrameDiscard => 0x3,
            CounterType::IngMcastFrame => 0x4,
            CounterType::IngMcastByte => 0x5,
            CounterType::IngBcastFrame => 0x6,
            CounterType::IngBcastBytes => 0x7,
            CounterType::EgrFrame => 0x8,
            CounterType::EgrByte => 0x9,
            CounterType::EgrFrameDiscard => 0xa,
            CounterType::EgrStpFrameDiscard => 0xb,
            CounterType::IngNoBufferDiscard => 0xc,
        }
    }
}

// ============================================================================
// FDB
// ============================================================================

/// Static/dynamic discriminator for forwarding entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FdbEntryType {
    #[default]
    Static,
    Dynamic,
}

impl FdbEntryType {
    pub(crate) fn to_wire(self) -> u64 {
        match self {
            FdbEntryType::Static => 0,
            FdbEntryType::Dynamic => 1,
        }
    }
}

/// MAC-learning mode of one forwarding database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LearningMode {
    /// Learning disabled.
    Disabled,
    /// Hardware learning.
    #[default]
    Hw,
    /// Non-secure learning by the firmware.
    NonSecure,
    /// Secure learning by the firmware.
    Secure,
}

impl LearningMode {
    pub(crate) fn to_wire(self) -> u64 {
        match self {
            LearningMode::Disabled => 0,
            LearningMode::Hw => 1,
            LearningMode::NonSecure => 2,
            LearningMode::Secure => 3,
        }
    }
}

// ============================================================================
// ACL
// ============================================================================

/// Frame flag matched via [`AclFields::frame_flags`]: hit only on FDB
/// lookup miss.
pub const ACL_MATCH_ON_FDB_MISS: u8 = 0x80;

/// Match (or mask) over L2/L3/L4 header fields.
///
/// In a mask, a 1 bit means the corresponding match bit is significant and a
/// 0 bit means don't-care. `Default` yields the match-nothing/all-don't-care
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AclFields {
    pub l2_dest_mac: MacAddr,
    pub l2_source_mac: MacAddr,
    pub l2_tpid: u16,
    pub l2_pcp_dei: u8,
    pub l2_vlan_id: u16,
    pub l2_ether_type: u16,
    pub l3_dscp: u8,
    pub l3_protocol: u8,
    pub l3_source_ip: u32,
    pub l3_dest_ip: u32,
    pub l4_source_port: u16,
    pub l4_dest_port: u16,
    /// See [`ACL_MATCH_ON_FDB_MISS`].
    pub frame_flags: u8,
}

/// Full match/mask key of one ACL entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AclKey {
    /// Values to match.
    pub match_fields: AclFields,
    /// Significance mask over `match_fields`.
    pub mask: AclFields,
}

/// Action taken when an ACL entry hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AclAction {
    /// Drop the frame.
    #[default]
    Drop,
    /// Redirect to the interface in [`AclResult::if_id`].
    Redirect,
    /// Accept the frame.
    Accept,
    /// Redirect to the control interface.
    RedirectToCtrlIf,
    /// Continue in the lookup table selected by [`AclResult::lookup_table`].
    Lookup,
}

impl AclAction {
    pub(crate) fn to_wire(self) -> u64 {
        match self {
            AclAction::Drop => 0,
            AclAction::Redirect => 1,
            AclAction::Accept => 2,
            AclAction::RedirectToCtrlIf => 3,
            AclAction::Lookup => 4,
        }
    }
}

/// Lookup table selected by [`AclAction::Lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AclLookupTable {
    #[default]
    Broadcast,
    Multicast,
    UnknownUnicast,
}

/// Result of an ACL entry hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AclResult {
    /// Action to take.
    pub action: AclAction,
    /// Redirect target; only meaningful for [`AclAction::Redirect`].
    pub if_id: u16,
    /// Chained table; only meaningful for [`AclAction::Lookup`].
    pub lookup_table: AclLookupTable,
}

/// One prioritized ACL entry referencing a prepared key buffer by address.
///
/// `key_iova` must point at memory filled by
/// [`prepare_entry_key`](crate::api::acl::prepare_entry_key) and stay
/// accessible to the firmware until the add-entry command completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclEntryCfg {
    /// Address of the prepared 256-byte key buffer.
    pub key_iova: u64,
    /// Action on hit.
    pub result: AclResult,
    /// Precedence inside the ACL; 0 is lowest and values must be unique per
    /// entry for the lifetime of the ACL.
    pub precedence: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_raw_roundtrip() {
        let token = Token::from_raw(0xbeef);
        assert_eq!(token.as_raw(), 0xbeef);
        assert_eq!(format!("{:?}", token), "Token(0xbeef)");
        assert_eq!(Token::NONE.as_raw(), 0);
    }

    #[test]
    fn test_mac_display_parse() {
        let mac: MacAddr = "00:04:9f:aa:bb:cc".parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x04, 0x9f, 0xaa, 0xbb, 0xcc]);
        assert_eq!(mac.to_string(), "00:04:9f:aa:bb:cc");

        assert!("00:04:9f:aa:bb".parse::<MacAddr>().is_err());
        assert!("00:04:9f:aa:bb:cc:dd".parse::<MacAddr>().is_err());
        assert!("zz:04:9f:aa:bb:cc".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_predicates() {
        assert!(MacAddr::ZERO.is_zero());
        assert!("01:00:5e:00:00:01".parse::<MacAddr>().unwrap().is_multicast());
        assert!(!"00:04:9f:00:00:01".parse::<MacAddr>().unwrap().is_multicast());
    }

    #[test]
    fn test_stp_state_wire_aliasing() {
        // Blocking and disabled intentionally share a wire value.
        assert_eq!(StpState::Blocking.to_wire(), StpState::Disabled.to_wire());
        assert_eq!(StpState::Listening.to_wire(), 1);
        assert_eq!(StpState::Learning.to_wire(), 2);
        assert_eq!(StpState::Forwarding.to_wire(), 3);
    }

    #[test]
    fn test_frame_admission_wire_values() {
        assert_eq!(FrameAdmission::from_wire(1), FrameAdmission::All);
        assert_eq!(FrameAdmission::from_wire(3), FrameAdmission::OnlyVlanTagged);
    }

    #[test]
    fn test_counter_type_wire_values() {
        assert_eq!(CounterType::IngFrame.to_wire(), 0x0);
        assert_eq!(CounterType::EgrStpFrameDiscard.to_wire(), 0xb);
        assert_eq!(CounterType::IngNoBufferDiscard.to_wire(), 0xc);
    }
}
