//! Byte-exact encoding checks for representative commands.
//!
//! A capturing portal records every submitted buffer so tests can compare
//! the serialized bytes against hand-computed layouts. Responses are echoed
//! back (or overridden per test) with an OK status.

use std::sync::Mutex;

use pretty_assertions::assert_eq;

use ethsw_mc::cmd::cmdid;
use ethsw_mc::{
    AclAction, AclEntryCfg, AclResult, CmdError, Command, FdbEntryType, FwStatus, LinkCfg,
    McPortal, PortalError, StpState, SwitchCtrl, TciCfg, Token,
};

struct CapturePortal {
    captured: Mutex<Vec<Command>>,
    next_response: Mutex<Option<Command>>,
}

impl CapturePortal {
    fn new() -> Self {
        CapturePortal {
            captured: Mutex::new(Vec::new()),
            next_response: Mutex::new(None),
        }
    }

    /// Queues the response returned for the next exchange.
    fn respond_with(&self, rsp: Command) {
        *self.next_response.lock().unwrap() = Some(rsp);
    }

    fn last_bytes(&self) -> [u8; ethsw_mc::CMD_BUF_LEN] {
        self.captured.lock().unwrap().last().unwrap().to_bytes()
    }
}

impl McPortal for CapturePortal {
    fn exchange(&self, cmd: Command) -> Result<Command, PortalError> {
        self.captured.lock().unwrap().push(cmd);
        let mut rsp = self.next_response.lock().unwrap().take().unwrap_or(cmd);
        if rsp.status() == FwStatus::Ready {
            rsp.set_status(FwStatus::Ok);
        }
        Ok(rsp)
    }
}

const HDR: usize = 8; // parameter region starts after the header word

#[test]
fn open_encodes_object_id_and_returns_response_token() {
    let portal = CapturePortal::new();

    let mut rsp = Command::new(cmdid::OPEN, Default::default(), Token::from_raw(0xbeef));
    rsp.set_status(FwStatus::Ok);
    portal.respond_with(rsp);

    let sw = SwitchCtrl::new(&portal);
    let token = sw.open(5).unwrap();
    assert_eq!(token.as_raw(), 0xbeef);

    let bytes = portal.last_bytes();
    // open is issued with the null token
    assert_eq!(&bytes[4..6], &[0x00, 0x00]);
    // object id 5, little-endian u32 at parameter offset 0
    assert_eq!(&bytes[HDR..HDR + 4], &[5, 0, 0, 0]);
}

#[test]
fn vlan_add_if_encodes_bitmap() {
    let portal = CapturePortal::new();
    let sw = SwitchCtrl::new(&portal);
    let token = Token::from_raw(0x1111);

    sw.vlan_add_if(token, 10, &[2, 3, 63, 64]).unwrap();

    let bytes = portal.last_bytes();
    assert_eq!(&bytes[4..6], &[0x11, 0x11]); // token in header
    assert_eq!(&bytes[HDR..HDR + 2], &[0, 0]); // leading pad
    assert_eq!(&bytes[HDR + 2..HDR + 4], &[10, 0]); // vlan id
    let word0 = u64::from_le_bytes(bytes[HDR + 8..HDR + 16].try_into().unwrap());
    // 64 is out of range and silently dropped
    assert_eq!(word0, (1 << 2) | (1 << 3) | (1 << 63));
    assert!(bytes[HDR + 16..].iter().all(|&b| b == 0));
}

#[test]
fn if_set_tci_packs_shared_word() {
    let portal = CapturePortal::new();
    let sw = SwitchCtrl::new(&portal);

    sw.if_set_tci(
        Token::from_raw(1),
        3,
        &TciCfg {
            vlan_id: 0xabc,
            dei: true,
            pcp: 5,
        },
    )
    .unwrap();

    let bytes = portal.last_bytes();
    assert_eq!(&bytes[HDR..HDR + 2], &[3, 0]);
    // vlan_id:12 | dei:1 | pcp:3 => 0xabc | 1<<12 | 5<<13 = 0xbabc
    assert_eq!(&bytes[HDR + 2..HDR + 4], &[0xbc, 0xba]);
}

#[test]
fn if_set_stp_conflates_blocking_and_disabled() {
    let portal = CapturePortal::new();
    let sw = SwitchCtrl::new(&portal);
    let token = Token::from_raw(1);

    sw.if_set_stp(token, 7, 10, StpState::Blocking).unwrap();
    let blocking = portal.last_bytes();
    sw.if_set_stp(token, 7, 10, StpState::Disabled).unwrap();
    let disabled = portal.last_bytes();

    assert_eq!(blocking[HDR + 4], 0);
    assert_eq!(blocking[HDR..], disabled[HDR..]);

    sw.if_set_stp(token, 7, 10, StpState::Forwarding).unwrap();
    assert_eq!(portal.last_bytes()[HDR + 4], 3);
}

#[test]
fn if_set_link_cfg_layout() {
    let portal = CapturePortal::new();
    let sw = SwitchCtrl::new(&portal);

    sw.if_set_link_cfg(
        Token::from_raw(1),
        9,
        &LinkCfg {
            rate: 10_000,
            options: ethsw_mc::types::link_opt::AUTONEG | ethsw_mc::types::link_opt::PAUSE,
        },
    )
    .unwrap();

    let bytes = portal.last_bytes();
    assert_eq!(&bytes[HDR..HDR + 2], &[9, 0]);
    assert_eq!(
        u32::from_le_bytes(bytes[HDR + 8..HDR + 12].try_into().unwrap()),
        10_000
    );
    assert_eq!(
        u64::from_le_bytes(bytes[HDR + 16..HDR + 24].try_into().unwrap()),
        0x5
    );
}

#[test]
fn fdb_add_multicast_layout() {
    let portal = CapturePortal::new();
    let sw = SwitchCtrl::new(&portal);

    sw.fdb_add_multicast(
        Token::from_raw(1),
        0,
        "01:00:5e:00:00:01".parse().unwrap(),
        &[2, 3],
        FdbEntryType::Static,
    )
    .unwrap();

    let bytes = portal.last_bytes();
    assert_eq!(&bytes[HDR..HDR + 2], &[0, 0]); // fdb id
    assert_eq!(&bytes[HDR + 2..HDR + 4], &[2, 0]); // num_ifs
    assert_eq!(bytes[HDR + 4], 0); // static entry type
    // MAC in wire order at offset 8
    assert_eq!(
        &bytes[HDR + 8..HDR + 14],
        &[0x01, 0x00, 0x00, 0x5e, 0x00, 0x01]
    );
    // bitmap at offset 16
    let word0 = u64::from_le_bytes(bytes[HDR + 16..HDR + 24].try_into().unwrap());
    assert_eq!(word0, (1 << 2) | (1 << 3));
}

#[test]
fn fdb_add_unicast_layout() {
    let portal = CapturePortal::new();
    let sw = SwitchCtrl::new(&portal);

    sw.fdb_add_unicast(
        Token::from_raw(1),
        2,
        "00:04:9f:00:00:07".parse().unwrap(),
        5,
        FdbEntryType::Dynamic,
    )
    .unwrap();

    let bytes = portal.last_bytes();
    assert_eq!(&bytes[HDR..HDR + 2], &[2, 0]);
    assert_eq!(
        &bytes[HDR + 2..HDR + 8],
        &[0x07, 0x00, 0x00, 0x9f, 0x04, 0x00]
    );
    assert_eq!(&bytes[HDR + 8..HDR + 10], &[5, 0]); // egress interface
    assert_eq!(bytes[HDR + 10], 1); // dynamic
}

#[test]
fn acl_add_entry_layout() {
    let portal = CapturePortal::new();
    let sw = SwitchCtrl::new(&portal);

    sw.acl_add_entry(
        Token::from_raw(1),
        4,
        &AclEntryCfg {
            key_iova: 0x0123_4567_89ab_cdef,
            precedence: 7,
            result: AclResult {
                action: AclAction::Redirect,
                if_id: 12,
                ..Default::default()
            },
        },
    )
    .unwrap();

    let bytes = portal.last_bytes();
    assert_eq!(&bytes[HDR..HDR + 2], &[4, 0]); // acl id
    assert_eq!(&bytes[HDR + 2..HDR + 4], &[12, 0]); // redirect target
    assert_eq!(
        u32::from_le_bytes(bytes[HDR + 4..HDR + 8].try_into().unwrap()),
        7
    );
    assert_eq!(bytes[HDR + 8], 1); // redirect action
    assert_eq!(
        u64::from_le_bytes(bytes[HDR + 48..HDR + 56].try_into().unwrap()),
        0x0123_4567_89ab_cdef
    );
}

#[test]
fn firmware_rejection_surfaces_status() {
    let portal = CapturePortal::new();
    let token = Token::from_raw(3);

    let mut rsp = Command::new(cmdid::VLAN_ADD, Default::default(), token);
    rsp.set_status(FwStatus::ConfigError);
    portal.respond_with(rsp);

    let sw = SwitchCtrl::new(&portal);
    let err = sw.vlan_add(token, 10, 0).unwrap_err();
    match err {
        CmdError::Firmware { opcode, status } => {
            assert_eq!(opcode, cmdid::VLAN_ADD);
            assert_eq!(status, FwStatus::ConfigError);
        }
        other => panic!("expected firmware error, got {other:?}"),
    }
}
