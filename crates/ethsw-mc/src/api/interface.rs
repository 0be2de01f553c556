//! Per-interface management: link, flooding, default tag, spanning tree,
//! counters, MAC addresses and frame length.

use crate::cmd::{cmdid, Command};
use crate::error::CmdResult;
use crate::portal::McPortal;
use crate::types::{
    CounterType, FrameAdmission, IfAttributes, LinkCfg, LinkState, MacAddr, StpState, TciCfg,
    Token,
};
use crate::wire::{pack_field, unpack_field};

use super::SwitchCtrl;

// Shared first word: every per-interface command starts with the interface
// id.
const IF_ID_OFF: usize = 0;

// if_get_attributes response
const IF_ATTR_CONF_OFF: usize = 0;
const IF_ATTR_NUM_TCS_OFF: usize = 2;
const IF_ATTR_QDID_OFF: usize = 4;
const IF_ATTR_OPTIONS_OFF: usize = 8;
const IF_ATTR_RATE_OFF: usize = 16;

const CONF_ENABLE_SHIFT: u32 = 0;
const CONF_ACCEPT_ALL_VLAN_SHIFT: u32 = 1;
const CONF_ADMIT_UNTAGGED_SHIFT: u32 = 2;
const CONF_ADMIT_UNTAGGED_WIDTH: u32 = 4;

// if_set_link_cfg
const LINK_CFG_RATE_OFF: usize = 8;
const LINK_CFG_OPTIONS_OFF: usize = 16;

// if_get_link_state response
const LINK_STATE_UP_OFF: usize = 4;
const LINK_STATE_RATE_OFF: usize = 8;
const LINK_STATE_OPTIONS_OFF: usize = 16;

// if_set_flooding / if_set_broadcast
const IF_ENABLE_OFF: usize = 2;

// if_set_tci: vlan id, drop eligibility and priority share one 16-bit word.
const TCI_CONF_OFF: usize = 2;
const TCI_VLAN_ID_SHIFT: u32 = 0;
const TCI_VLAN_ID_WIDTH: u32 = 12;
const TCI_DEI_SHIFT: u32 = 12;
const TCI_DEI_WIDTH: u32 = 1;
const TCI_PCP_SHIFT: u32 = 13;
const TCI_PCP_WIDTH: u32 = 3;

// if_get_tci response: the same three values come back as separate plain
// fields, not packed. Inherited asymmetry, preserved bit-for-bit.
const TCI_RSP_VLAN_ID_OFF: usize = 2;
const TCI_RSP_DEI_OFF: usize = 4;
const TCI_RSP_PCP_OFF: usize = 5;

// if_set_stp
const STP_VLAN_ID_OFF: usize = 2;
const STP_STATE_OFF: usize = 4;
const STP_STATE_SHIFT: u32 = 0;
const STP_STATE_WIDTH: u32 = 4;

// if_get_counter
const COUNTER_TYPE_OFF: usize = 2;
const COUNTER_TYPE_SHIFT: u32 = 0;
const COUNTER_TYPE_WIDTH: u32 = 5;
const COUNTER_RSP_OFF: usize = 8;

// if_set_max_frame_length
const FRAME_LENGTH_OFF: usize = 2;

// MAC address commands
const MAC_ADDR_OFF: usize = 2;

const BIT: u32 = 1;

impl<P: McPortal> SwitchCtrl<P> {
    /// Retrieves the attribute snapshot of interface `if_id`.
    pub fn if_get_attributes(&self, token: Token, if_id: u16) -> CmdResult<IfAttributes> {
        let mut cmd = Command::new(cmdid::IF_GET_ATTR, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        let rsp = self.submit(cmd)?;

        let conf = u64::from(rsp.get_u8(IF_ATTR_CONF_OFF));
        Ok(IfAttributes {
            num_tcs: rsp.get_u8(IF_ATTR_NUM_TCS_OFF),
            qdid: rsp.get_u16(IF_ATTR_QDID_OFF),
            options: rsp.get_u32(IF_ATTR_OPTIONS_OFF),
            rate: rsp.get_u32(IF_ATTR_RATE_OFF),
            enabled: unpack_field(conf, CONF_ENABLE_SHIFT, BIT) != 0,
            accept_all_vlan: unpack_field(conf, CONF_ACCEPT_ALL_VLAN_SHIFT, BIT) != 0,
            admit_untagged: FrameAdmission::from_wire(unpack_field(
                conf,
                CONF_ADMIT_UNTAGGED_SHIFT,
                CONF_ADMIT_UNTAGGED_WIDTH,
            )),
        })
    }

    /// Sets the link configuration of interface `if_id`.
    pub fn if_set_link_cfg(&self, token: Token, if_id: u16, cfg: &LinkCfg) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::IF_SET_LINK_CFG, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        cmd.put_u32(LINK_CFG_RATE_OFF, cfg.rate);
        cmd.put_u64(LINK_CFG_OPTIONS_OFF, cfg.options);
        self.submit(cmd)?;
        Ok(())
    }

    /// Returns the observed link state of interface `if_id`.
    pub fn if_get_link_state(&self, token: Token, if_id: u16) -> CmdResult<LinkState> {
        let mut cmd = Command::new(cmdid::IF_GET_LINK_STATE, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        let rsp = self.submit(cmd)?;

        Ok(LinkState {
            up: unpack_field(rsp.get_u8(LINK_STATE_UP_OFF).into(), 0, BIT) != 0,
            rate: rsp.get_u32(LINK_STATE_RATE_OFF),
            options: rsp.get_u64(LINK_STATE_OPTIONS_OFF),
        })
    }

    /// Enables or disables flooding of unknown-destination frames on
    /// interface `if_id`.
    pub fn if_set_flooding(&self, token: Token, if_id: u16, en: bool) -> CmdResult<()> {
        self.if_set_enable_bit(cmdid::IF_SET_FLOODING, token, if_id, en)
    }

    /// Enables or disables broadcast egress on interface `if_id`.
    pub fn if_set_broadcast(&self, token: Token, if_id: u16, en: bool) -> CmdResult<()> {
        self.if_set_enable_bit(cmdid::IF_SET_BROADCAST, token, if_id, en)
    }

    fn if_set_enable_bit(&self, cmd_id: u16, token: Token, if_id: u16, en: bool) -> CmdResult<()> {
        let mut cmd = Command::new(cmd_id, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        cmd.put_u8(IF_ENABLE_OFF, pack_field(0, 0, BIT, u64::from(en)) as u8);
        self.submit(cmd)?;
        Ok(())
    }

    /// Sets the default VLAN tag control information of interface `if_id`.
    pub fn if_set_tci(&self, token: Token, if_id: u16, cfg: &TciCfg) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::IF_SET_TCI, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);

        let mut conf = 0u64;
        conf = pack_field(conf, TCI_VLAN_ID_SHIFT, TCI_VLAN_ID_WIDTH, cfg.vlan_id.into());
        conf = pack_field(conf, TCI_DEI_SHIFT, TCI_DEI_WIDTH, u64::from(cfg.dei));
        conf = pack_field(conf, TCI_PCP_SHIFT, TCI_PCP_WIDTH, cfg.pcp.into());
        cmd.put_u16(TCI_CONF_OFF, conf as u16);

        self.submit(cmd)?;
        Ok(())
    }

    /// Returns the default VLAN tag control information of interface
    /// `if_id`.
    pub fn if_get_tci(&self, token: Token, if_id: u16) -> CmdResult<TciCfg> {
        let mut cmd = Command::new(cmdid::IF_GET_TCI, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        let rsp = self.submit(cmd)?;

        Ok(TciCfg {
            vlan_id: rsp.get_u16(TCI_RSP_VLAN_ID_OFF),
            dei: rsp.get_u8(TCI_RSP_DEI_OFF) != 0,
            pcp: rsp.get_u8(TCI_RSP_PCP_OFF),
        })
    }

    /// Sets the spanning-tree state of interface `if_id` within `vlan_id`.
    ///
    /// Note that [`StpState::Blocking`] and [`StpState::Disabled`] encode
    /// identically; the firmware cannot distinguish them.
    pub fn if_set_stp(
        &self,
        token: Token,
        if_id: u16,
        vlan_id: u16,
        state: StpState,
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::IF_SET_STP, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        cmd.put_u16(STP_VLAN_ID_OFF, vlan_id);
        cmd.put_u8(
            STP_STATE_OFF,
            pack_field(0, STP_STATE_SHIFT, STP_STATE_WIDTH, state.to_wire()) as u8,
        );
        self.submit(cmd)?;
        Ok(())
    }

    /// Reads one 64-bit counter of interface `if_id`.
    pub fn if_get_counter(
        &self,
        token: Token,
        if_id: u16,
        counter: CounterType,
    ) -> CmdResult<u64> {
        let mut cmd = Command::new(cmdid::IF_GET_COUNTER, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        cmd.put_u8(
            COUNTER_TYPE_OFF,
            pack_field(0, COUNTER_TYPE_SHIFT, COUNTER_TYPE_WIDTH, counter.to_wire()) as u8,
        );
        let rsp = self.submit(cmd)?;
        Ok(rsp.get_u64(COUNTER_RSP_OFF))
    }

    /// Enables interface `if_id`.
    pub fn if_enable(&self, token: Token, if_id: u16) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::IF_ENABLE, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        self.submit(cmd)?;
        Ok(())
    }

    /// Disables interface `if_id`.
    pub fn if_disable(&self, token: Token, if_id: u16) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::IF_DISABLE, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        self.submit(cmd)?;
        Ok(())
    }

    /// Sets the maximum receive frame length of interface `if_id`.
    pub fn if_set_max_frame_length(
        &self,
        token: Token,
        if_id: u16,
        frame_length: u16,
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::IF_SET_MAX_FRAME_LENGTH, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        cmd.put_u16(FRAME_LENGTH_OFF, frame_length);
        self.submit(cmd)?;
        Ok(())
    }

    /// Returns the MAC address of the physical port behind interface
    /// `if_id`, or the zero address if there is none.
    pub fn if_get_port_mac_addr(&self, token: Token, if_id: u16) -> CmdResult<MacAddr> {
        self.if_get_mac(cmdid::IF_GET_PORT_MAC_ADDR, token, if_id)
    }

    /// Returns the primary MAC address of interface `if_id`.
    pub fn if_get_primary_mac_addr(&self, token: Token, if_id: u16) -> CmdResult<MacAddr> {
        self.if_get_mac(cmdid::IF_GET_PRIMARY_MAC_ADDR, token, if_id)
    }

    fn if_get_mac(&self, cmd_id: u16, token: Token, if_id: u16) -> CmdResult<MacAddr> {
        let mut cmd = Command::new(cmd_id, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        let rsp = self.submit(cmd)?;
        Ok(rsp.get_mac(MAC_ADDR_OFF))
    }

    /// Sets the primary MAC address of interface `if_id`.
    pub fn if_set_primary_mac_addr(
        &self,
        token: Token,
        if_id: u16,
        mac_addr: MacAddr,
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::IF_SET_PRIMARY_MAC_ADDR, self.flags(), token);
        cmd.put_u16(IF_ID_OFF, if_id);
        cmd.put_mac(MAC_ADDR_OFF, &mac_addr);
        self.submit(cmd)?;
        Ok(())
    }
}
