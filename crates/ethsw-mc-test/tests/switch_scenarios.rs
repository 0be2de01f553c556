//! End-to-end scenarios against the mock firmware.
//!
//! These exercise the full encode → exchange → decode path plus the remote
//! semantics the firmware contract promises: atomic membership commands,
//! group lifecycle, precedence uniqueness and the two-phase ACL key
//! protocol.

use pretty_assertions::assert_eq;

use ethsw_mc::{
    parse_fdb_dump, prepare_entry_key, AclAction, AclEntryCfg, AclFields, AclKey, AclResult,
    CmdError, CounterType, FdbDumpKind, FdbEntryType, FwStatus, LearningMode, LinkCfg, MacAddr,
    PortalError, StpState, SwitchCtrl, TciCfg, Token,
};
use ethsw_mc_test::MockFirmware;

fn open_switch(fw: &MockFirmware) -> (SwitchCtrl<&MockFirmware>, Token) {
    let sw = SwitchCtrl::new(fw);
    let token = sw.open(5).expect("open");
    (sw, token)
}

fn assert_config_error(err: CmdError) {
    assert_eq!(err.fw_status(), Some(FwStatus::ConfigError));
}

#[test]
fn open_unknown_object_is_a_transport_error() {
    let fw = MockFirmware::new().with_object(5);
    let sw = SwitchCtrl::new(&fw);

    let err = sw.open(6).unwrap_err();
    assert!(matches!(
        err,
        CmdError::Portal(PortalError::NotFound)
    ));
}

#[test]
fn session_lifecycle() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    sw.enable(token).unwrap();
    assert!(fw.is_enabled());
    sw.disable(token).unwrap();
    assert!(!fw.is_enabled());

    sw.close(token).unwrap();
    // A closed token is rejected by the firmware, not locally.
    let err = sw.enable(token).unwrap_err();
    assert_eq!(err.fw_status(), Some(FwStatus::AuthError));
}

#[test]
fn attributes_report_interface_count() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    let attrs = sw.get_attributes(token).unwrap();
    assert_eq!(attrs.id, 5);
    assert_eq!(attrs.num_ifs, 16);
    assert_eq!(attrs.max_vlans, 16);
    assert_eq!(attrs.fdb_aging_time, 300);
    assert_eq!(attrs.num_vlans, 0);

    sw.vlan_add(token, 10, 0).unwrap();
    assert_eq!(sw.get_attributes(token).unwrap().num_vlans, 1);
}

#[test]
fn api_version_needs_no_token() {
    let fw = MockFirmware::new();
    let sw = SwitchCtrl::new(&fw);
    let version = sw.get_api_version().unwrap();
    assert_eq!((version.major, version.minor), (8, 0));
}

#[test]
fn vlan_membership_flow() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    sw.vlan_add(token, 10, 0).unwrap();
    assert_eq!(fw.vlan_fdb_id(10), Some(0));
    // Duplicate id is rejected.
    assert_config_error(sw.vlan_add(token, 10, 0).unwrap_err());

    sw.vlan_add_if(token, 10, &[2, 3]).unwrap();
    assert_eq!(fw.vlan_members(10), Some(vec![2, 3]));

    // Untagged subset requires membership.
    sw.vlan_add_if_untagged(token, 10, &[2]).unwrap();
    assert_config_error(sw.vlan_add_if_untagged(token, 10, &[5]).unwrap_err());

    // Already-untagged interfaces cannot be added again.
    assert_config_error(sw.vlan_add_if_untagged(token, 10, &[2]).unwrap_err());
    sw.vlan_remove_if_untagged(token, 10, &[2]).unwrap();

    sw.vlan_remove_if(token, 10, &[2, 3]).unwrap();
    assert_eq!(fw.vlan_members(10), Some(vec![]));

    sw.vlan_remove(token, 10).unwrap();
    assert_eq!(fw.vlan_members(10), None);
}

#[test]
fn vlan_membership_commands_are_atomic() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    sw.vlan_add(token, 20, 0).unwrap();
    sw.vlan_add_if(token, 20, &[3]).unwrap();

    // One of the two is already a member: nothing is applied.
    assert_config_error(sw.vlan_add_if(token, 20, &[2, 3]).unwrap_err());
    assert_eq!(fw.vlan_members(20), Some(vec![3]));

    // One of the two is absent: nothing is removed.
    assert_config_error(sw.vlan_remove_if(token, 20, &[2, 3]).unwrap_err());
    assert_eq!(fw.vlan_members(20), Some(vec![3]));
}

#[test]
fn multicast_group_lifecycle_shows_in_dump() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);
    let group_mac: MacAddr = "01:00:5e:00:00:01".parse().unwrap();

    sw.fdb_add_multicast(token, 0, group_mac, &[2, 3], FdbEntryType::Static)
        .unwrap();

    let iova = fw.alloc_dma(512);
    let count = sw.fdb_dump(token, 0, iova, 512).unwrap();
    assert_eq!(count, 1);

    let region = fw.dma_bytes(iova);
    let entries: Vec<_> = parse_fdb_dump(&region).collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mac_addr, group_mac);
    assert_eq!(
        entries[0].kind,
        FdbDumpKind::Multicast {
            num_ifs: 2,
            if_mask: (1 << 2) | (1 << 3),
        }
    );

    // Removing every member deletes the group.
    sw.fdb_remove_multicast(token, 0, group_mac, &[2, 3], FdbEntryType::Static)
        .unwrap();

    let iova = fw.alloc_dma(512);
    let count = sw.fdb_dump(token, 0, iova, 512).unwrap();
    assert_eq!(count, 0);
    assert_eq!(parse_fdb_dump(&fw.dma_bytes(iova)).count(), 0);
}

#[test]
fn multicast_group_membership_preconditions() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);
    let group_mac: MacAddr = "01:00:5e:00:00:02".parse().unwrap();

    sw.fdb_add_multicast(token, 0, group_mac, &[1], FdbEntryType::Static)
        .unwrap();
    // Interface 1 is already in the group; the whole command is rejected.
    assert_config_error(
        sw.fdb_add_multicast(token, 0, group_mac, &[1, 2], FdbEntryType::Static)
            .unwrap_err(),
    );
    // Interface 2 never joined.
    assert_config_error(
        sw.fdb_remove_multicast(token, 0, group_mac, &[2], FdbEntryType::Static)
            .unwrap_err(),
    );
}

#[test]
fn unicast_entries_roundtrip_through_dump() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);
    let mac: MacAddr = "00:04:9f:00:00:07".parse().unwrap();

    sw.fdb_add_unicast(token, 0, mac, 4, FdbEntryType::Dynamic)
        .unwrap();
    assert_config_error(
        sw.fdb_add_unicast(token, 0, mac, 4, FdbEntryType::Dynamic)
            .unwrap_err(),
    );

    let iova = fw.alloc_dma(256);
    assert_eq!(sw.fdb_dump(token, 0, iova, 256).unwrap(), 1);
    let region = fw.dma_bytes(iova);
    let entries: Vec<_> = parse_fdb_dump(&region).collect();
    assert_eq!(entries[0].mac_addr, mac);
    assert_eq!(entries[0].entry_type, FdbEntryType::Dynamic);
    assert_eq!(entries[0].kind, FdbDumpKind::Unicast { if_egress: 4 });

    sw.fdb_remove_unicast(token, 0, mac, 4, FdbEntryType::Dynamic)
        .unwrap();
    let iova = fw.alloc_dma(256);
    assert_eq!(sw.fdb_dump(token, 0, iova, 256).unwrap(), 0);
}

#[test]
fn dump_stops_when_region_is_full() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    for i in 0..4u8 {
        let mac = MacAddr::new([0x00, 0x04, 0x9f, 0x00, 0x00, i + 1]);
        sw.fdb_add_unicast(token, 0, mac, i.into(), FdbEntryType::Static)
            .unwrap();
    }

    // Room for two records only.
    let iova = fw.alloc_dma(32);
    assert_eq!(sw.fdb_dump(token, 0, iova, 32).unwrap(), 2);
    assert_eq!(parse_fdb_dump(&fw.dma_bytes(iova)).count(), 2);
}

#[test]
fn learning_mode_and_reset() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    sw.fdb_set_learning_mode(token, 0, LearningMode::Secure)
        .unwrap();
    assert_eq!(fw.learning_mode(0), Some(3));
    sw.vlan_add(token, 30, 0).unwrap();

    // Reset clears remote configuration but keeps the session valid.
    sw.reset(token).unwrap();
    assert_eq!(fw.vlan_members(30), None);
    sw.vlan_add(token, 30, 0).unwrap();
}

#[test]
fn acl_two_phase_entry_protocol() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    let acl_id = sw.acl_add(token, 4).unwrap();
    sw.acl_add_if(token, acl_id, &[2, 3]).unwrap();
    assert_eq!(fw.acl_if_ids(acl_id), Some(vec![2, 3]));
    sw.acl_remove_if(token, acl_id, &[3]).unwrap();
    assert_eq!(fw.acl_if_ids(acl_id), Some(vec![2]));

    let key = AclKey {
        match_fields: AclFields {
            l2_ether_type: 0x0800,
            l3_protocol: 17,
            l4_dest_port: 4789,
            ..AclFields::default()
        },
        mask: AclFields {
            l2_ether_type: 0xffff,
            l3_protocol: 0xff,
            l4_dest_port: 0xffff,
            ..AclFields::default()
        },
    };
    let prepared = prepare_entry_key(&key);

    // Phase one: place the prepared bytes in firmware-visible memory.
    let key_iova = fw.alloc_dma(256);
    fw.dma_write(key_iova, prepared.as_bytes());

    // Phase two: reference the buffer by address.
    sw.acl_add_entry(
        token,
        acl_id,
        &AclEntryCfg {
            key_iova,
            precedence: 0,
            result: AclResult {
                action: AclAction::Accept,
                ..AclResult::default()
            },
        },
    )
    .unwrap();

    // The firmware read exactly the prepared bytes.
    assert_eq!(fw.acl_entry_key(acl_id, 0).unwrap(), prepared.as_bytes());
    assert_eq!(fw.acl_entry_result(acl_id, 0), Some((2, 0)));

    // A second entry at the same precedence is rejected.
    let err = sw
        .acl_add_entry(
            token,
            acl_id,
            &AclEntryCfg {
                key_iova,
                precedence: 0,
                result: AclResult::default(),
            },
        )
        .unwrap_err();
    assert_config_error(err);
    assert_eq!(fw.acl_entry_count(acl_id), 1);
}

#[test]
fn acl_capacity_and_removal() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    let acl_id = sw.acl_add(token, 1).unwrap();
    let key_iova = fw.alloc_dma(256);
    fw.dma_write(key_iova, prepare_entry_key(&AclKey::default()).as_bytes());

    let entry = |precedence| AclEntryCfg {
        key_iova,
        precedence,
        result: AclResult::default(),
    };
    sw.acl_add_entry(token, acl_id, &entry(0)).unwrap();
    let err = sw.acl_add_entry(token, acl_id, &entry(1)).unwrap_err();
    assert_eq!(err.fw_status(), Some(FwStatus::NoResource));

    sw.acl_remove(token, acl_id).unwrap();
    assert_config_error(sw.acl_remove(token, acl_id).unwrap_err());

    // An unmapped key address is a DMA failure.
    let acl_id = sw.acl_add(token, 4).unwrap();
    let err = sw
        .acl_add_entry(
            token,
            acl_id,
            &AclEntryCfg {
                key_iova: 0xdead_0000,
                precedence: 0,
                result: AclResult::default(),
            },
        )
        .unwrap_err();
    assert_eq!(err.fw_status(), Some(FwStatus::DmaError));
}

#[test]
fn interface_configuration_roundtrips() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);

    sw.if_set_link_cfg(
        token,
        2,
        &LinkCfg {
            rate: 1000,
            options: ethsw_mc::types::link_opt::AUTONEG,
        },
    )
    .unwrap();
    fw.set_link_up(2, true);

    let state = sw.if_get_link_state(token, 2).unwrap();
    assert!(state.up);
    assert_eq!(state.rate, 1000);
    assert_eq!(state.options, ethsw_mc::types::link_opt::AUTONEG);

    let tci = TciCfg {
        vlan_id: 100,
        dei: false,
        pcp: 3,
    };
    sw.if_set_tci(token, 2, &tci).unwrap();
    assert_eq!(sw.if_get_tci(token, 2).unwrap(), tci);

    sw.if_enable(token, 2).unwrap();
    let attrs = sw.if_get_attributes(token, 2).unwrap();
    assert!(attrs.enabled);
    assert_eq!(attrs.num_tcs, 8);

    sw.if_set_flooding(token, 2, false).unwrap();
    sw.if_set_broadcast(token, 2, true).unwrap();
    sw.if_set_max_frame_length(token, 2, 9100).unwrap();
    assert_eq!(fw.if_config(2), Some((false, true, 9100)));

    // STP state needs an existing VLAN.
    sw.vlan_add(token, 40, 0).unwrap();
    sw.if_set_stp(token, 2, 40, StpState::Forwarding).unwrap();
    assert_config_error(
        sw.if_set_stp(token, 2, 41, StpState::Forwarding)
            .unwrap_err(),
    );

    // Out-of-range interface ids are the firmware's to reject.
    assert_config_error(sw.if_enable(token, 16).unwrap_err());
}

#[test]
fn interface_mac_and_counters() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);
    let mac: MacAddr = "00:04:9f:05:06:07".parse().unwrap();

    sw.if_set_primary_mac_addr(token, 3, mac).unwrap();
    assert_eq!(sw.if_get_primary_mac_addr(token, 3).unwrap(), mac);

    fw.set_counter(3, CounterType::IngFrame, 12345);
    assert_eq!(
        sw.if_get_counter(token, 3, CounterType::IngFrame).unwrap(),
        12345
    );
    assert_eq!(
        sw.if_get_counter(token, 3, CounterType::EgrFrame).unwrap(),
        0
    );
}

#[test]
fn irq_status_is_write_one_to_clear() {
    let fw = MockFirmware::new().with_object(5);
    let (sw, token) = open_switch(&fw);
    let line = ethsw_mc::types::IRQ_INDEX_IF;

    sw.set_irq_enable(token, line, true).unwrap();
    sw.set_irq_mask(token, line, ethsw_mc::types::IRQ_EVENT_LINK_CHANGED)
        .unwrap();
    assert_eq!(
        fw.irq_line(line),
        Some((true, ethsw_mc::types::IRQ_EVENT_LINK_CHANGED))
    );

    fw.raise_irq(line, 0b101);
    assert_eq!(sw.get_irq_status(token, line).unwrap(), 0b101);

    // Clearing bit 0 leaves bit 2 pending.
    sw.clear_irq_status(token, line, 0b001).unwrap();
    assert_eq!(sw.get_irq_status(token, line).unwrap(), 0b100);

    assert_config_error(sw.get_irq_status(token, 9).unwrap_err());
}
