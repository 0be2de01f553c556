//! Forwarding-database management: unicast and multicast entries, learning
//! mode, and bulk-dump retrieval.

use crate::cmd::{cmdid, Command};
use crate::error::CmdResult;
use crate::portal::McPortal;
use crate::types::{FdbEntryType, LearningMode, MacAddr, Token};
use crate::wire::{build_if_id_bitmap, mac_from_wire, pack_field};

use super::SwitchCtrl;

// unicast operations
const UC_FDB_ID_OFF: usize = 0;
const UC_MAC_ADDR_OFF: usize = 2;
const UC_IF_EGRESS_OFF: usize = 8;
const UC_TYPE_OFF: usize = 10;

// multicast operations
const MC_FDB_ID_OFF: usize = 0;
const MC_NUM_IFS_OFF: usize = 2;
const MC_TYPE_OFF: usize = 4;
const MC_MAC_ADDR_OFF: usize = 8;
const MC_IF_BITMAP_OFF: usize = 16;

const ENTRY_TYPE_SHIFT: u32 = 0;
const ENTRY_TYPE_WIDTH: u32 = 4;

// set_learning_mode
const LEARN_FDB_ID_OFF: usize = 0;
const LEARN_MODE_OFF: usize = 2;
const LEARNING_MODE_SHIFT: u32 = 0;
const LEARNING_MODE_WIDTH: u32 = 4;

// dump
const DUMP_FDB_ID_OFF: usize = 0;
const DUMP_IOVA_ADDR_OFF: usize = 8;
const DUMP_IOVA_SIZE_OFF: usize = 16;
const DUMP_RSP_NUM_ENTRIES_OFF: usize = 0;

/// Size of one dump record written by the firmware.
pub const FDB_DUMP_ENTRY_LEN: usize = 16;

const DUMP_TYPE_DYNAMIC: u8 = 1 << 0;
const DUMP_TYPE_UNICAST: u8 = 1 << 1;

impl<P: McPortal> SwitchCtrl<P> {
    /// Adds a unicast entry mapping `mac_addr` to egress interface
    /// `if_egress` in database `fdb_id`.
    pub fn fdb_add_unicast(
        &self,
        token: Token,
        fdb_id: u16,
        mac_addr: MacAddr,
        if_egress: u16,
        entry_type: FdbEntryType,
    ) -> CmdResult<()> {
        self.fdb_unicast_op(
            cmdid::FDB_ADD_UNICAST,
            token,
            fdb_id,
            mac_addr,
            if_egress,
            entry_type,
        )
    }

    /// Removes the unicast entry for `mac_addr` from database `fdb_id`.
    pub fn fdb_remove_unicast(
        &self,
        token: Token,
        fdb_id: u16,
        mac_addr: MacAddr,
        if_egress: u16,
        entry_type: FdbEntryType,
    ) -> CmdResult<()> {
        self.fdb_unicast_op(
            cmdid::FDB_REMOVE_UNICAST,
            token,
            fdb_id,
            mac_addr,
            if_egress,
            entry_type,
        )
    }

    fn fdb_unicast_op(
        &self,
        cmd_id: u16,
        token: Token,
        fdb_id: u16,
        mac_addr: MacAddr,
        if_egress: u16,
        entry_type: FdbEntryType,
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmd_id, self.flags(), token);
        cmd.put_u16(UC_FDB_ID_OFF, fdb_id);
        cmd.put_mac(UC_MAC_ADDR_OFF, &mac_addr);
        cmd.put_u16(UC_IF_EGRESS_OFF, if_egress);
        cmd.put_u8(
            UC_TYPE_OFF,
            pack_field(0, ENTRY_TYPE_SHIFT, ENTRY_TYPE_WIDTH, entry_type.to_wire()) as u8,
        );
        self.submit(cmd)?;
        Ok(())
    }

    /// Adds `if_ids` to the multicast group for `mac_addr` in database
    /// `fdb_id`. A missing group is created. All listed interfaces must not
    /// yet belong to the group; otherwise the entire command is rejected.
    pub fn fdb_add_multicast(
        &self,
        token: Token,
        fdb_id: u16,
        mac_addr: MacAddr,
        if_ids: &[u16],
        entry_type: FdbEntryType,
    ) -> CmdResult<()> {
        self.fdb_multicast_op(
            cmdid::FDB_ADD_MULTICAST,
            token,
            fdb_id,
            mac_addr,
            if_ids,
            entry_type,
        )
    }

    /// Removes `if_ids` from the multicast group for `mac_addr` in database
    /// `fdb_id`. All listed interfaces must belong to the group; removing
    /// the last member deletes the group.
    pub fn fdb_remove_multicast(
        &self,
        token: Token,
        fdb_id: u16,
        mac_addr: MacAddr,
        if_ids: &[u16],
        entry_type: FdbEntryType,
    ) -> CmdResult<()> {
        self.fdb_multicast_op(
            cmdid::FDB_REMOVE_MULTICAST,
            token,
            fdb_id,
            mac_addr,
            if_ids,
            entry_type,
        )
    }

    fn fdb_multicast_op(
        &self,
        cmd_id: u16,
        token: Token,
        fdb_id: u16,
        mac_addr: MacAddr,
        if_ids: &[u16],
        entry_type: FdbEntryType,
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmd_id, self.flags(), token);
        cmd.put_u16(MC_FDB_ID_OFF, fdb_id);
        cmd.put_u16(MC_NUM_IFS_OFF, if_ids.len() as u16);
        cmd.put_u8(
            MC_TYPE_OFF,
            pack_field(0, ENTRY_TYPE_SHIFT, ENTRY_TYPE_WIDTH, entry_type.to_wire()) as u8,
        );
        cmd.put_mac(MC_MAC_ADDR_OFF, &mac_addr);
        cmd.put_if_bitmap(MC_IF_BITMAP_OFF, &build_if_id_bitmap(if_ids, if_ids.len()));
        self.submit(cmd)?;
        Ok(())
    }

    /// Sets the MAC-learning mode of database `fdb_id`.
    pub fn fdb_set_learning_mode(
        &self,
        token: Token,
        fdb_id: u16,
        mode: LearningMode,
    ) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::FDB_SET_LEARNING_MODE, self.flags(), token);
        cmd.put_u16(LEARN_FDB_ID_OFF, fdb_id);
        cmd.put_u8(
            LEARN_MODE_OFF,
            pack_field(0, LEARNING_MODE_SHIFT, LEARNING_MODE_WIDTH, mode.to_wire()) as u8,
        );
        self.submit(cmd)?;
        Ok(())
    }

    /// Dumps database `fdb_id` into caller-owned memory at `iova_addr`.
    ///
    /// The region must be zero-filled before the call and mapped for
    /// firmware access. The firmware writes [`FDB_DUMP_ENTRY_LEN`]-byte
    /// records until the table is exhausted or the region is full; parse the
    /// region with [`parse_fdb_dump`]. Returns the number of records
    /// written.
    pub fn fdb_dump(
        &self,
        token: Token,
        fdb_id: u16,
        iova_addr: u64,
        iova_size: u32,
    ) -> CmdResult<u16> {
        let mut cmd = Command::new(cmdid::FDB_DUMP, self.flags(), token);
        cmd.put_u16(DUMP_FDB_ID_OFF, fdb_id);
        cmd.put_u64(DUMP_IOVA_ADDR_OFF, iova_addr);
        cmd.put_u32(DUMP_IOVA_SIZE_OFF, iova_size);
        let rsp = self.submit(cmd)?;
        Ok(rsp.get_u16(DUMP_RSP_NUM_ENTRIES_OFF))
    }
}

/// Destination of one dump record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdbDumpKind {
    /// Unicast entry with a single egress interface.
    Unicast {
        if_egress: u16,
    },
    /// Multicast group entry with a member bitmap.
    Multicast {
        num_ifs: u8,
        if_mask: u64,
    },
}

impl FdbDumpKind {
    /// Iterates the egress interfaces of this record.
    pub fn interfaces(&self) -> impl Iterator<Item = u16> + '_ {
        let (single, mask) = match *self {
            FdbDumpKind::Unicast { if_egress } => (Some(if_egress), 0u64),
            FdbDumpKind::Multicast { if_mask, .. } => (None, if_mask),
        };
        single
            .into_iter()
            .chain((0..64u16).filter(move |i| mask & (1 << i) != 0))
    }
}

/// One record of an FDB dump snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdbDumpEntry {
    /// Looked-up MAC address.
    pub mac_addr: MacAddr,
    /// Static or dynamic (aged) entry.
    pub entry_type: FdbEntryType,
    /// Unicast egress interface or multicast membership.
    pub kind: FdbDumpKind,
}

impl FdbDumpEntry {
    /// Decodes one record from `raw` (at least [`FDB_DUMP_ENTRY_LEN`]
    /// bytes). Returns `None` for the all-zero-MAC end marker.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        let mac_addr = mac_from_wire(&raw[..6]);
        if mac_addr.is_zero() {
            return None;
        }

        let type_byte = raw[6];
        let if_info = raw[7];
        let entry_type = if type_byte & DUMP_TYPE_DYNAMIC != 0 {
            FdbEntryType::Dynamic
        } else {
            FdbEntryType::Static
        };
        let kind = if type_byte & DUMP_TYPE_UNICAST != 0 {
            FdbDumpKind::Unicast {
                if_egress: if_info.into(),
            }
        } else {
            let mut mask_bytes = [0u8; 8];
            mask_bytes.copy_from_slice(&raw[8..16]);
            FdbDumpKind::Multicast {
                num_ifs: if_info,
                if_mask: u64::from_le_bytes(mask_bytes),
            }
        };

        Some(FdbDumpEntry {
            mac_addr,
            entry_type,
            kind,
        })
    }
}

/// Iterates the records of a dump region, stopping at the end of the region
/// or at the first all-zero-MAC record, whichever comes first.
pub fn parse_fdb_dump(region: &[u8]) -> impl Iterator<Item = FdbDumpEntry> + '_ {
    region
        .chunks_exact(FDB_DUMP_ENTRY_LEN)
        .map_while(FdbDumpEntry::decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unicast_record(mac: &MacAddr, if_egress: u8, dynamic: bool) -> [u8; 16] {
        let mut rec = [0u8; 16];
        rec[..6].copy_from_slice(&crate::wire::mac_to_wire(mac));
        rec[6] = DUMP_TYPE_UNICAST | u8::from(dynamic);
        rec[7] = if_egress;
        rec
    }

    fn multicast_record(mac: &MacAddr, if_mask: u64) -> [u8; 16] {
        let mut rec = [0u8; 16];
        rec[..6].copy_from_slice(&crate::wire::mac_to_wire(mac));
        rec[6] = 0; // static multicast
        rec[7] = if_mask.count_ones() as u8;
        rec[8..16].copy_from_slice(&if_mask.to_le_bytes());
        rec
    }

    #[test]
    fn test_decode_unicast_record() {
        let mac: MacAddr = "00:04:9f:00:00:07".parse().unwrap();
        let entry = FdbDumpEntry::decode(&unicast_record(&mac, 3, true)).unwrap();
        assert_eq!(entry.mac_addr, mac);
        assert_eq!(entry.entry_type, FdbEntryType::Dynamic);
        assert_eq!(entry.kind, FdbDumpKind::Unicast { if_egress: 3 });
        assert_eq!(entry.kind.interfaces().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_decode_multicast_record() {
        let mac: MacAddr = "01:00:5e:00:00:01".parse().unwrap();
        let mask = (1 << 2) | (1 << 3);
        let entry = FdbDumpEntry::decode(&multicast_record(&mac, mask)).unwrap();
        assert_eq!(entry.entry_type, FdbEntryType::Static);
        assert_eq!(
            entry.kind,
            FdbDumpKind::Multicast {
                num_ifs: 2,
                if_mask: mask
            }
        );
        assert_eq!(entry.kind.interfaces().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_parse_stops_at_zero_mac() {
        let mac: MacAddr = "00:04:9f:00:00:01".parse().unwrap();
        let mut region = Vec::new();
        region.extend_from_slice(&unicast_record(&mac, 1, false));
        region.extend_from_slice(&[0u8; 16]); // end marker
        region.extend_from_slice(&unicast_record(&mac, 2, false)); // unreachable

        let entries: Vec<_> = parse_fdb_dump(&region).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, FdbDumpKind::Unicast { if_egress: 1 });
    }

    #[test]
    fn test_parse_stops_at_region_end() {
        let mac: MacAddr = "00:04:9f:00:00:01".parse().unwrap();
        let mut region = Vec::new();
        region.extend_from_slice(&unicast_record(&mac, 1, false));
        region.extend_from_slice(&unicast_record(&mac, 2, false));
        // A trailing partial record is never yielded.
        region.extend_from_slice(&[0xee; 7]);

        let entries: Vec<_> = parse_fdb_dump(&region).collect();
        assert_eq!(entries.len(), 2);
    }
}
