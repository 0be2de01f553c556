//! Control-plane command layer for a management-complex L2 switch object.
//!
//! A host configures and queries a hardware switch fabric object by
//! exchanging fixed-size command/response buffers with remote management
//! firmware. This crate owns the marshaling half of that contract: encoding
//! structured requests into the 64-byte command buffer, decoding responses
//! back into attributes, and the domain-specific rules (bit-field packing,
//! little-endian normalization, reversed MAC byte order, interface bitmaps)
//! that make the formats exact.
//!
//! # Architecture
//!
//! - [`wire`]: bit-field and byte-order primitives plus the interface bitmap
//!   builder
//! - [`cmd`]: the command buffer, header envelope and operation ids
//! - [`portal`]: the [`McPortal`] transport boundary trait
//! - [`error`]: firmware status decoding and error types
//! - [`types`]: attribute snapshots and wire-value enums
//! - [`api`]: the command set, grouped by object area (lifecycle, IRQ,
//!   interface, VLAN, FDB, ACL)
//!
//! # Example
//!
//! ```ignore
//! use ethsw_mc::{SwitchCtrl, CmdResult};
//!
//! fn bring_up<P: ethsw_mc::McPortal>(portal: P) -> CmdResult<()> {
//!     let sw = SwitchCtrl::new(portal);
//!     let token = sw.open(5)?;
//!     sw.enable(token)?;
//!     sw.vlan_add(token, 10, 0)?;
//!     sw.vlan_add_if(token, 10, &[2, 3])?;
//!     sw.close(token)
//! }
//! ```
//!
//! The protocol is synchronous and stateless between calls: each command
//! function performs exactly one exchange. All persistent switch state lives
//! in the firmware; the only thing a caller holds is the session token
//! returned by [`SwitchCtrl::open`]. Concurrent callers mutating the same
//! remote object must serialize themselves — the firmware applies commands
//! atomically but this layer adds no locking and no retries.

pub mod api;
pub mod cmd;
pub mod error;
pub mod portal;
pub mod types;
pub mod wire;

pub use api::acl::{prepare_entry_key, PreparedAclKey, ACL_KEY_BUF_LEN};
pub use api::fdb::{parse_fdb_dump, FdbDumpEntry, FdbDumpKind, FDB_DUMP_ENTRY_LEN};
pub use api::SwitchCtrl;
pub use cmd::{CmdFlags, Command, CMD_BUF_LEN, CMD_PARAM_LEN};
pub use error::{CmdError, CmdResult, FwStatus, PortalError};
pub use portal::McPortal;
pub use types::{
    AclAction, AclEntryCfg, AclFields, AclKey, AclLookupTable, AclResult, ApiVersion,
    ComponentType, CounterType, FdbEntryType, FrameAdmission, IfAttributes, LearningMode, LinkCfg,
    LinkState, MacAddr, StpState, SwitchAttributes, TciCfg, Token,
};
pub use wire::{MAX_IF, IF_BITMAP_WORDS};
