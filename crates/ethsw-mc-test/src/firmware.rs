//! An in-process mock of the switch management firmware.
//!
//! The mock decodes command buffers with its own offset tables — the point
//! of a wire contract is that both ends implement it independently — and
//! keeps the remote-side state the real firmware would: VLAN membership,
//! forwarding databases, ACLs and fake DMA regions. Rejections use the same
//! in-band status codes as real firmware; only a missing object id is a
//! transport-level failure.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use log::debug;

use ethsw_mc::cmd::cmdid;
use ethsw_mc::{Command, FwStatus, McPortal, PortalError, Token, MAX_IF};

/// Capacity and identity knobs reported through `get_attributes`.
#[derive(Debug, Clone, Copy)]
pub struct MockConfig {
    pub num_ifs: u16,
    pub max_vlans: u16,
    pub max_fdbs: u8,
    pub max_fdb_entries: u16,
    pub fdb_aging_time: u16,
    pub max_fdb_mc_groups: u16,
    pub max_meters_per_if: u8,
    pub mem_size: u16,
    pub options: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            num_ifs: 16,
            max_vlans: 16,
            max_fdbs: 8,
            max_fdb_entries: 1024,
            fdb_aging_time: 300,
            max_fdb_mc_groups: 32,
            max_meters_per_if: 4,
            mem_size: 0x1000,
            options: 0,
        }
    }
}

#[derive(Debug, Default)]
struct VlanState {
    fdb_id: u16,
    members: BTreeSet<u16>,
    untagged: BTreeSet<u16>,
}

#[derive(Debug)]
struct AclEntry {
    action: u8,
    if_id: u16,
    key: Vec<u8>,
}

#[derive(Debug)]
struct AclState {
    max_entries: u16,
    if_ids: BTreeSet<u16>,
    entries: BTreeMap<u32, AclEntry>,
}

#[derive(Debug, Default)]
struct IfState {
    enabled: bool,
    flooding: bool,
    broadcast: bool,
    max_frame_length: u16,
    rate: u32,
    link_options: u64,
    link_up: bool,
    tci: (u16, bool, u8), // vlan id, dei, pcp
    primary_mac: [u8; 6],
}

#[derive(Debug, Default, Clone, Copy)]
struct IrqLine {
    enabled: bool,
    mask: u32,
    status: u32,
}

#[derive(Default)]
struct State {
    config: MockConfig,
    object_ids: BTreeSet<u32>,
    next_token: u16,
    sessions: HashMap<u16, u32>,
    enabled: bool,
    vlans: BTreeMap<u16, VlanState>,
    unicast: BTreeMap<(u16, [u8; 6]), (u16, u8)>,
    groups: BTreeMap<(u16, [u8; 6]), BTreeSet<u16>>,
    learning: BTreeMap<u16, u8>,
    acls: BTreeMap<u16, AclState>,
    next_acl_id: u16,
    interfaces: BTreeMap<u16, IfState>,
    irqs: BTreeMap<u8, IrqLine>,
    counters: BTreeMap<(u16, u8), u64>,
    dma: BTreeMap<u64, Vec<u8>>,
    next_iova: u64,
}

enum Reject {
    Fw(FwStatus),
    Portal(PortalError),
}

impl From<FwStatus> for Reject {
    fn from(status: FwStatus) -> Self {
        Reject::Fw(status)
    }
}

type Handled = Result<(), Reject>;

/// Mock firmware speaking the command channel.
pub struct MockFirmware {
    state: Mutex<State>,
}

impl MockFirmware {
    /// Creates a firmware with default capacities and no objects. Register
    /// an object id with [`with_object`](MockFirmware::with_object) before
    /// opening sessions.
    pub fn new() -> Self {
        let state = State {
            config: MockConfig::default(),
            next_token: 1,
            next_acl_id: 1,
            next_iova: 0x10_0000,
            ..State::default()
        };
        MockFirmware {
            state: Mutex::new(state),
        }
    }

    /// Registers a switch object id that `open` can authenticate against.
    pub fn with_object(self, object_id: u32) -> Self {
        self.state.lock().unwrap().object_ids.insert(object_id);
        self
    }

    /// Overrides the reported capacities.
    pub fn with_config(self, config: MockConfig) -> Self {
        self.state.lock().unwrap().config = config;
        self
    }

    /// Allocates a zero-filled firmware-accessible region and returns its
    /// address, standing in for the platform DMA allocator.
    pub fn alloc_dma(&self, len: usize) -> u64 {
        let mut state = self.state.lock().unwrap();
        let iova = state.next_iova;
        state.next_iova += (len as u64).max(8).next_power_of_two();
        state.dma.insert(iova, vec![0u8; len]);
        iova
    }

    /// Copies out the contents of a DMA region.
    pub fn dma_bytes(&self, iova: u64) -> Vec<u8> {
        self.state.lock().unwrap().dma[&iova].clone()
    }

    /// Writes caller data into a DMA region.
    pub fn dma_write(&self, iova: u64, bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let region = state.dma.get_mut(&iova).expect("unknown DMA region");
        region[..bytes.len()].copy_from_slice(bytes);
    }

    /// Latches pending-cause bits on an interrupt line.
    pub fn raise_irq(&self, irq_index: u8, causes: u32) {
        let mut state = self.state.lock().unwrap();
        state.irqs.entry(irq_index).or_default().status |= causes;
    }

    /// Sets a counter readable via `if_get_counter`.
    pub fn set_counter(&self, if_id: u16, counter: ethsw_mc::CounterType, value: u64) {
        let mut state = self.state.lock().unwrap();
        state
            .counters
            .insert((if_id, counter_wire(counter)), value);
    }

    /// Marks a link up or down for `if_get_link_state`.
    pub fn set_link_up(&self, if_id: u16, up: bool) {
        let mut state = self.state.lock().unwrap();
        state.interfaces.entry(if_id).or_default().link_up = up;
    }

    /// Current members of a VLAN, for test assertions.
    pub fn vlan_members(&self, vlan_id: u16) -> Option<Vec<u16>> {
        let state = self.state.lock().unwrap();
        state
            .vlans
            .get(&vlan_id)
            .map(|v| v.members.iter().copied().collect())
    }

    /// Forwarding database backing a VLAN.
    pub fn vlan_fdb_id(&self, vlan_id: u16) -> Option<u16> {
        let state = self.state.lock().unwrap();
        state.vlans.get(&vlan_id).map(|v| v.fdb_id)
    }

    /// Wire value of the learning mode last set on a database.
    pub fn learning_mode(&self, fdb_id: u16) -> Option<u8> {
        self.state.lock().unwrap().learning.get(&fdb_id).copied()
    }

    /// Interfaces associated with an ACL.
    pub fn acl_if_ids(&self, acl_id: u16) -> Option<Vec<u16>> {
        let state = self.state.lock().unwrap();
        state
            .acls
            .get(&acl_id)
            .map(|a| a.if_ids.iter().copied().collect())
    }

    /// (flooding, broadcast, max frame length) last configured on an
    /// interface.
    pub fn if_config(&self, if_id: u16) -> Option<(bool, bool, u16)> {
        let state = self.state.lock().unwrap();
        state
            .interfaces
            .get(&if_id)
            .map(|i| (i.flooding, i.broadcast, i.max_frame_length))
    }

    /// Number of entries currently in an ACL, for test assertions.
    pub fn acl_entry_count(&self, acl_id: u16) -> usize {
        let state = self.state.lock().unwrap();
        state.acls.get(&acl_id).map_or(0, |a| a.entries.len())
    }

    /// Key bytes the firmware read for one ACL entry, for test assertions
    /// on the two-phase prepare/submit protocol.
    pub fn acl_entry_key(&self, acl_id: u16, precedence: u32) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .acls
            .get(&acl_id)
            .and_then(|a| a.entries.get(&precedence))
            .map(|e| e.key.clone())
    }

    /// Stored (action, redirect interface) of one ACL entry.
    pub fn acl_entry_result(&self, acl_id: u16, precedence: u32) -> Option<(u8, u16)> {
        let state = self.state.lock().unwrap();
        state
            .acls
            .get(&acl_id)
            .and_then(|a| a.entries.get(&precedence))
            .map(|e| (e.action, e.if_id))
    }

    /// Whether the switch is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    /// (enabled, cause mask) last configured on an interrupt line.
    pub fn irq_line(&self, irq_index: u8) -> Option<(bool, u32)> {
        let state = self.state.lock().unwrap();
        state.irqs.get(&irq_index).map(|l| (l.enabled, l.mask))
    }
}

impl Default for MockFirmware {
    fn default() -> Self {
        Self::new()
    }
}

impl McPortal for MockFirmware {
    fn exchange(&self, cmd: Command) -> Result<Command, PortalError> {
        let mut state = self.state.lock().unwrap();
        let mut rsp = cmd;
        match state.dispatch(&cmd, &mut rsp) {
            Ok(()) => rsp.set_status(FwStatus::Ok),
            Err(Reject::Fw(status)) => {
                debug!("rejecting command 0x{:04x}: {}", cmd.cmd_id(), status);
                rsp.set_status(status);
            }
            Err(Reject::Portal(err)) => return Err(err),
        }
        Ok(rsp)
    }
}

fn counter_wire(counter: ethsw_mc::CounterType) -> u8 {
    // The mock keys counters by the wire enumerant, the same value the
    // command carries.
    use ethsw_mc::CounterType::*;
    match counter {
        IngFrame => 0x0,
        IngByte => 0x1,
        IngFltrFrame => 0x2,
        IngFrameDiscard => 0x3,
        IngMcastFrame => 0x4,
        IngMcastByte => 0x5,
        IngBcastFrame => 0x6,
        IngBcastBytes => 0x7,
        EgrFrame => 0x8,
        EgrByte => 0x9,
        EgrFrameDiscard => 0xa,
        EgrStpFrameDiscard => 0xb,
        IngNoBufferDiscard => 0xc,
    }
}

fn bitmap_if_ids(cmd: &Command, off: usize) -> Vec<u16> {
    let mut ids = Vec::new();
    for word_idx in 0..4usize {
        let word = cmd.get_u64(off + word_idx * 8);
        for bit in 0..64u16 {
            if word & (1 << bit) != 0 {
                ids.push(word_idx as u16 * 64 + bit);
            }
        }
    }
    ids
}

fn wire_mac(cmd: &Command, off: usize) -> [u8; 6] {
    // Stored key: canonical order, so assertions read naturally.
    cmd.get_mac(off).octets()
}

impl State {
    fn dispatch(&mut self, cmd: &Command, rsp: &mut Command) -> Handled {
        match cmd.cmd_id() {
            cmdid::OPEN => self.open(cmd, rsp),
            cmdid::GET_API_VERSION => {
                rsp.put_u16(0, 8);
                rsp.put_u16(2, 0);
                Ok(())
            }
            other => {
                self.check_token(cmd.token())?;
                match other {
                    cmdid::CLOSE => {
                        self.sessions.remove(&cmd.token().as_raw());
                        Ok(())
                    }
                    cmdid::ENABLE => {
                        self.enabled = true;
                        Ok(())
                    }
                    cmdid::DISABLE => {
                        self.enabled = false;
                        Ok(())
                    }
                    cmdid::RESET => {
                        self.vlans.clear();
                        self.unicast.clear();
                        self.groups.clear();
                        self.learning.clear();
                        self.acls.clear();
                        self.interfaces.clear();
                        self.enabled = false;
                        Ok(())
                    }
                    cmdid::GET_ATTR => self.get_attributes(cmd, rsp),

                    cmdid::SET_IRQ_ENABLE => self.irq_op(cmd, |line, cmd| {
                        line.enabled = cmd.get_u8(0) & 1 != 0;
                    }),
                    cmdid::SET_IRQ_MASK => self.irq_op(cmd, |line, cmd| {
                        line.mask = cmd.get_u32(0);
                    }),
                    cmdid::CLEAR_IRQ_STATUS => self.irq_op(cmd, |line, cmd| {
                        line.status &= !cmd.get_u32(0);
                    }),
                    cmdid::GET_IRQ_STATUS => {
                        let index = cmd.get_u8(4);
                        self.check_irq_index(index)?;
                        let status = self.irqs.entry(index).or_default().status;
                        rsp.put_u32(4, status);
                        Ok(())
                    }

                    cmdid::IF_GET_ATTR => self.if_get_attributes(cmd, rsp),
                    cmdid::IF_SET_LINK_CFG => self.if_op(cmd, |ifs, cmd| {
                        ifs.rate = cmd.get_u32(8);
                        ifs.link_options = cmd.get_u64(16);
                        Ok(())
                    }),
                    cmdid::IF_GET_LINK_STATE => {
                        let ifs = self.if_state(cmd)?;
                        let (up, rate, options) = (ifs.link_up, ifs.rate, ifs.link_options);
                        rsp.put_u8(4, up.into());
                        rsp.put_u32(8, rate);
                        rsp.put_u64(16, options);
                        Ok(())
                    }
                    cmdid::IF_SET_FLOODING => self.if_op(cmd, |ifs, cmd| {
                        ifs.flooding = cmd.get_u8(2) & 1 != 0;
                        Ok(())
                    }),
                    cmdid::IF_SET_BROADCAST => self.if_op(cmd, |ifs, cmd| {
                        ifs.broadcast = cmd.get_u8(2) & 1 != 0;
                        Ok(())
                    }),
                    cmdid::IF_SET_TCI => self.if_op(cmd, |ifs, cmd| {
                        let conf = cmd.get_u16(2);
                        ifs.tci = (
                            conf & 0x0fff,
                            conf & 0x1000 != 0,
                            ((conf >> 13) & 0x7) as u8,
                        );
                        Ok(())
                    }),
                    cmdid::IF_GET_TCI => {
                        let ifs = self.if_state(cmd)?;
                        let (vlan_id, dei, pcp) = ifs.tci;
                        rsp.put_u16(2, vlan_id);
                        rsp.put_u8(4, dei.into());
                        rsp.put_u8(5, pcp);
                        Ok(())
                    }
                    cmdid::IF_SET_STP => {
                        let vlan_id = cmd.get_u16(2);
                        self.if_state(cmd)?;
                        if !self.vlans.contains_key(&vlan_id) {
                            return Err(FwStatus::ConfigError.into());
                        }
                        Ok(())
                    }
                    cmdid::IF_GET_COUNTER => {
                        let if_id = cmd.get_u16(0);
                        self.check_if_id(if_id)?;
                        let counter_type = cmd.get_u8(2) & 0x1f;
                        let value = self
                            .counters
                            .get(&(if_id, counter_type))
                            .copied()
                            .unwrap_or(0);
                        rsp.put_u64(8, value);
                        Ok(())
                    }
                    cmdid::IF_ENABLE => self.if_op(cmd, |ifs, _| {
                        ifs.enabled = true;
                        Ok(())
                    }),
                    cmdid::IF_DISABLE => self.if_op(cmd, |ifs, _| {
                        ifs.enabled = false;
                        Ok(())
                    }),
                    cmdid::IF_SET_MAX_FRAME_LENGTH => self.if_op(cmd, |ifs, cmd| {
                        ifs.max_frame_length = cmd.get_u16(2);
                        Ok(())
                    }),
                    cmdid::IF_SET_PRIMARY_MAC_ADDR => self.if_op(cmd, |ifs, cmd| {
                        ifs.primary_mac = wire_mac(cmd, 2);
                        Ok(())
                    }),
                    cmdid::IF_GET_PRIMARY_MAC_ADDR | cmdid::IF_GET_PORT_MAC_ADDR => {
                        let ifs = self.if_state(cmd)?;
                        let mac = ethsw_mc::MacAddr::new(ifs.primary_mac);
                        rsp.put_mac(2, &mac);
                        Ok(())
                    }

                    cmdid::VLAN_ADD => self.vlan_add(cmd),
                    cmdid::VLAN_ADD_IF => self.vlan_manage(cmd, VlanOp::AddIf),
                    cmdid::VLAN_ADD_IF_UNTAGGED => self.vlan_manage(cmd, VlanOp::AddUntagged),
                    cmdid::VLAN_REMOVE_IF => self.vlan_manage(cmd, VlanOp::RemoveIf),
                    cmdid::VLAN_REMOVE_IF_UNTAGGED => {
                        self.vlan_manage(cmd, VlanOp::RemoveUntagged)
                    }
                    cmdid::VLAN_REMOVE => {
                        let vlan_id = cmd.get_u16(2);
                        self.vlans
                            .remove(&vlan_id)
                            .map(|_| ())
                            .ok_or(Reject::Fw(FwStatus::ConfigError))
                    }

                    cmdid::FDB_ADD_UNICAST => self.fdb_unicast(cmd, true),
                    cmdid::FDB_REMOVE_UNICAST => self.fdb_unicast(cmd, false),
                    cmdid::FDB_ADD_MULTICAST => self.fdb_multicast(cmd, true),
                    cmdid::FDB_REMOVE_MULTICAST => self.fdb_multicast(cmd, false),
                    cmdid::FDB_SET_LEARNING_MODE => {
                        let fdb_id = cmd.get_u16(0);
                        self.check_fdb_id(fdb_id)?;
                        self.learning.insert(fdb_id, cmd.get_u8(2) & 0xf);
                        Ok(())
                    }
                    cmdid::FDB_DUMP => self.fdb_dump(cmd, rsp),

                    cmdid::ACL_ADD => {
                        let acl_id = self.next_acl_id;
                        self.next_acl_id += 1;
                        self.acls.insert(
                            acl_id,
                            AclState {
                                max_entries: cmd.get_u16(2),
                                if_ids: BTreeSet::new(),
                                entries: BTreeMap::new(),
                            },
                        );
                        rsp.put_u16(0, acl_id);
                        Ok(())
                    }
                    cmdid::ACL_REMOVE => {
                        let acl_id = cmd.get_u16(0);
                        self.acls
                            .remove(&acl_id)
                            .map(|_| ())
                            .ok_or(Reject::Fw(FwStatus::ConfigError))
                    }
                    cmdid::ACL_ADD_IF | cmdid::ACL_REMOVE_IF => {
                        let acl_id = cmd.get_u16(0);
                        let if_ids = bitmap_if_ids(cmd, 8);
                        let acl = self
                            .acls
                            .get_mut(&acl_id)
                            .ok_or(Reject::Fw(FwStatus::ConfigError))?;
                        if other == cmdid::ACL_ADD_IF {
                            acl.if_ids.extend(if_ids);
                        } else {
                            for if_id in if_ids {
                                acl.if_ids.remove(&if_id);
                            }
                        }
                        Ok(())
                    }
                    cmdid::ACL_ADD_ENTRY => self.acl_add_entry(cmd),

                    _ => Err(FwStatus::UnsupportedOp.into()),
                }
            }
        }
    }

    fn open(&mut self, cmd: &Command, rsp: &mut Command) -> Handled {
        let object_id = cmd.get_u32(0);
        if !self.object_ids.contains(&object_id) {
            return Err(Reject::Portal(PortalError::NotFound));
        }
        let token = self.next_token;
        self.next_token += 1;
        self.sessions.insert(token, object_id);
        rsp.set_token(Token::from_raw(token));
        Ok(())
    }

    fn check_token(&self, token: Token) -> Handled {
        if self.sessions.contains_key(&token.as_raw()) {
            Ok(())
        } else {
            Err(FwStatus::AuthError.into())
        }
    }

    fn check_if_id(&self, if_id: u16) -> Handled {
        if if_id < self.config.num_ifs && if_id < MAX_IF {
            Ok(())
        } else {
            Err(FwStatus::ConfigError.into())
        }
    }

    fn check_fdb_id(&self, fdb_id: u16) -> Handled {
        if fdb_id < u16::from(self.config.max_fdbs) {
            Ok(())
        } else {
            Err(FwStatus::ConfigError.into())
        }
    }

    fn check_irq_index(&self, index: u8) -> Handled {
        if index <= 1 {
            Ok(())
        } else {
            Err(FwStatus::ConfigError.into())
        }
    }

    fn get_attributes(&mut self, cmd: &Command, rsp: &mut Command) -> Handled {
        let object_id = self.sessions[&cmd.token().as_raw()];
        let cfg = self.config;
        rsp.put_u16(0, cfg.num_ifs);
        rsp.put_u8(2, cfg.max_fdbs);
        rsp.put_u8(3, 1); // the default forwarding database always exists
        rsp.put_u16(4, cfg.max_vlans);
        rsp.put_u16(6, self.vlans.len() as u16);
        rsp.put_u16(8, cfg.max_fdb_entries);
        rsp.put_u16(10, cfg.fdb_aging_time);
        rsp.put_u32(12, object_id);
        rsp.put_u16(16, cfg.mem_size);
        rsp.put_u16(18, cfg.max_fdb_mc_groups);
        rsp.put_u8(20, cfg.max_meters_per_if);
        rsp.put_u8(21, 0); // C-VLAN component
        rsp.put_u64(24, cfg.options);
        Ok(())
    }

    fn if_state(&mut self, cmd: &Command) -> Result<&mut IfState, Reject> {
        let if_id = cmd.get_u16(0);
        self.check_if_id(if_id)?;
        Ok(self.interfaces.entry(if_id).or_default())
    }

    fn if_op(
        &mut self,
        cmd: &Command,
        op: impl FnOnce(&mut IfState, &Command) -> Handled,
    ) -> Handled {
        let ifs = self.if_state(cmd)?;
        op(ifs, cmd)
    }

    fn irq_op(&mut self, cmd: &Command, op: impl FnOnce(&mut IrqLine, &Command)) -> Handled {
        let index = cmd.get_u8(4);
        self.check_irq_index(index)?;
        op(self.irqs.entry(index).or_default(), cmd);
        Ok(())
    }

    fn if_get_attributes(&mut self, cmd: &Command, rsp: &mut Command) -> Handled {
        let num_tcs = 8u8;
        let qdid = 0x40 + cmd.get_u16(0);
        let ifs = self.if_state(cmd)?;
        let conf = u8::from(ifs.enabled) | (1 << 2); // admit all untagged frames
        let rate = ifs.rate;
        rsp.put_u8(0, conf);
        rsp.put_u8(2, num_tcs);
        rsp.put_u16(4, qdid);
        rsp.put_u32(8, 0);
        rsp.put_u32(16, rate);
        Ok(())
    }

    fn vlan_add(&mut self, cmd: &Command) -> Handled {
        let fdb_id = cmd.get_u16(0);
        let vlan_id = cmd.get_u16(2);
        if vlan_id == 0x000 || vlan_id == 0xfff {
            return Err(FwStatus::ConfigError.into());
        }
        self.check_fdb_id(fdb_id)?;
        if self.vlans.contains_key(&vlan_id) {
            return Err(FwStatus::ConfigError.into());
        }
        if self.vlans.len() >= usize::from(self.config.max_vlans) {
            return Err(FwStatus::NoResource.into());
        }
        self.vlans.insert(
            vlan_id,
            VlanState {
                fdb_id,
                ..VlanState::default()
            },
        );
        Ok(())
    }

    fn vlan_manage(&mut self, cmd: &Command, op: VlanOp) -> Handled {
        let vlan_id = cmd.get_u16(2);
        let if_ids = bitmap_if_ids(cmd, 8);
        let num_ifs = self.config.num_ifs;
        let vlan = self
            .vlans
            .get_mut(&vlan_id)
            .ok_or(Reject::Fw(FwStatus::ConfigError))?;

        // Preconditions first: each command applies fully or not at all.
        let valid = if_ids.iter().all(|id| *id < num_ifs)
            && match op {
                VlanOp::AddIf => if_ids.iter().all(|id| !vlan.members.contains(id)),
                VlanOp::RemoveIf => if_ids.iter().all(|id| vlan.members.contains(id)),
                VlanOp::AddUntagged => if_ids
                    .iter()
                    .all(|id| vlan.members.contains(id) && !vlan.untagged.contains(id)),
                VlanOp::RemoveUntagged => if_ids.iter().all(|id| vlan.untagged.contains(id)),
            };
        if !valid {
            return Err(FwStatus::ConfigError.into());
        }

        for id in if_ids {
            match op {
                VlanOp::AddIf => {
                    vlan.members.insert(id);
                }
                VlanOp::RemoveIf => {
                    vlan.members.remove(&id);
                    vlan.untagged.remove(&id);
                }
                VlanOp::AddUntagged => {
                    vlan.untagged.insert(id);
                }
                VlanOp::RemoveUntagged => {
                    vlan.untagged.remove(&id);
                }
            }
        }
        Ok(())
    }

    fn fdb_unicast(&mut self, cmd: &Command, add: bool) -> Handled {
        let fdb_id = cmd.get_u16(0);
        self.check_fdb_id(fdb_id)?;
        let mac = wire_mac(cmd, 2);
        let if_egress = cmd.get_u16(8);
        let entry_type = cmd.get_u8(10) & 0xf;
        let key = (fdb_id, mac);

        if add {
            if self.unicast.contains_key(&key) {
                return Err(FwStatus::ConfigError.into());
            }
            self.unicast.insert(key, (if_egress, entry_type));
        } else {
            match self.unicast.get(&key) {
                Some((egress, _)) if *egress == if_egress => {
                    self.unicast.remove(&key);
                }
                _ => return Err(FwStatus::ConfigError.into()),
            }
        }
        Ok(())
    }

    fn fdb_multicast(&mut self, cmd: &Command, add: bool) -> Handled {
        let fdb_id = cmd.get_u16(0);
        self.check_fdb_id(fdb_id)?;
        let mac = wire_mac(cmd, 8);
        let if_ids = bitmap_if_ids(cmd, 16);
        let key = (fdb_id, mac);

        if add {
            if self.groups.len() >= usize::from(self.config.max_fdb_mc_groups) {
                return Err(FwStatus::NoResource.into());
            }
            let group = self.groups.entry(key).or_default();
            if if_ids.iter().any(|id| group.contains(id)) {
                return Err(FwStatus::ConfigError.into());
            }
            group.extend(if_ids);
        } else {
            let group = self
                .groups
                .get_mut(&key)
                .ok_or(Reject::Fw(FwStatus::ConfigError))?;
            if if_ids.iter().any(|id| !group.contains(id)) {
                return Err(FwStatus::ConfigError.into());
            }
            for id in &if_ids {
                group.remove(id);
            }
            if group.is_empty() {
                self.groups.remove(&key);
            }
        }
        Ok(())
    }

    fn fdb_dump(&mut self, cmd: &Command, rsp: &mut Command) -> Handled {
        let fdb_id = cmd.get_u16(0);
        self.check_fdb_id(fdb_id)?;
        let iova = cmd.get_u64(8);
        let size = cmd.get_u32(16) as usize;

        let mut records: Vec<[u8; 16]> = Vec::new();
        for ((id, mac), (egress, entry_type)) in &self.unicast {
            if *id != fdb_id {
                continue;
            }
            let mut rec = [0u8; 16];
            write_wire_mac(&mut rec, mac);
            rec[6] = 0x2 | (entry_type & 0x1); // unicast bit + dynamic bit
            rec[7] = *egress as u8;
            records.push(rec);
        }
        for ((id, mac), members) in &self.groups {
            if *id != fdb_id {
                continue;
            }
            let mut rec = [0u8; 16];
            write_wire_mac(&mut rec, mac);
            rec[6] = 0; // static multicast
            rec[7] = members.len() as u8;
            let mut mask = 0u64;
            for member in members {
                mask |= 1 << member;
            }
            rec[8..16].copy_from_slice(&mask.to_le_bytes());
            records.push(rec);
        }

        let region = self
            .dma
            .get_mut(&iova)
            .ok_or(Reject::Fw(FwStatus::DmaError))?;
        let capacity = size.min(region.len()) / 16;
        let written = records.len().min(capacity);
        for (i, rec) in records.iter().take(written).enumerate() {
            region[i * 16..(i + 1) * 16].copy_from_slice(rec);
        }
        rsp.put_u16(0, written as u16);
        Ok(())
    }

    fn acl_add_entry(&mut self, cmd: &Command) -> Handled {
        let acl_id = cmd.get_u16(0);
        let result_if_id = cmd.get_u16(2);
        let precedence = cmd.get_u32(4);
        let action = cmd.get_u8(8) & 0xf;
        let key_iova = cmd.get_u64(48);

        let key = match self.dma.get(&key_iova) {
            Some(region) if region.len() >= 256 => region[..256].to_vec(),
            _ => return Err(FwStatus::DmaError.into()),
        };
        let acl = self
            .acls
            .get_mut(&acl_id)
            .ok_or(Reject::Fw(FwStatus::ConfigError))?;
        if acl.entries.len() >= usize::from(acl.max_entries) {
            return Err(FwStatus::NoResource.into());
        }
        if acl.entries.contains_key(&precedence) {
            return Err(FwStatus::ConfigError.into());
        }
        acl.entries.insert(
            precedence,
            AclEntry {
                action,
                if_id: result_if_id,
                key,
            },
        );
        Ok(())
    }
}

enum VlanOp {
    AddIf,
    AddUntagged,
    RemoveIf,
    RemoveUntagged,
}

fn write_wire_mac(rec: &mut [u8; 16], canonical: &[u8; 6]) {
    for i in 0..6 {
        rec[i] = canonical[5 - i];
    }
}
