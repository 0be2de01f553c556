//! Interrupt control.
//!
//! Two interrupt lines exist ([`IRQ_INDEX_IF`](crate::types::IRQ_INDEX_IF)
//! and [`IRQ_INDEX_L2SW`](crate::types::IRQ_INDEX_L2SW)); each multiplexes
//! up to 32 independent cause bits.

use crate::cmd::{cmdid, Command};
use crate::error::CmdResult;
use crate::portal::McPortal;
use crate::types::Token;
use crate::wire::pack_field;

use super::SwitchCtrl;

const IRQ_ENABLE_STATE_OFF: usize = 0;
const IRQ_MASK_OFF: usize = 0;
const IRQ_STATUS_OFF: usize = 0;
const IRQ_INDEX_OFF: usize = 4;
const IRQ_RSP_STATUS_OFF: usize = 4;

const ENABLE_SHIFT: u32 = 0;
const ENABLE_WIDTH: u32 = 1;

impl<P: McPortal> SwitchCtrl<P> {
    /// Sets the overall interrupt state of one line. While disabled, no
    /// cause raises an interrupt.
    pub fn set_irq_enable(&self, token: Token, irq_index: u8, en: bool) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::SET_IRQ_ENABLE, self.flags(), token);
        cmd.put_u8(
            IRQ_ENABLE_STATE_OFF,
            pack_field(0, ENABLE_SHIFT, ENABLE_WIDTH, u64::from(en)) as u8,
        );
        cmd.put_u8(IRQ_INDEX_OFF, irq_index);
        self.submit(cmd)?;
        Ok(())
    }

    /// Sets the cause mask of one line. A set bit means the cause may assert
    /// the interrupt; a clear bit means the event is ignored.
    pub fn set_irq_mask(&self, token: Token, irq_index: u8, mask: u32) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::SET_IRQ_MASK, self.flags(), token);
        cmd.put_u32(IRQ_MASK_OFF, mask);
        cmd.put_u8(IRQ_INDEX_OFF, irq_index);
        self.submit(cmd)?;
        Ok(())
    }

    /// Returns the pending-cause bits of one line.
    pub fn get_irq_status(&self, token: Token, irq_index: u8) -> CmdResult<u32> {
        let mut cmd = Command::new(cmdid::GET_IRQ_STATUS, self.flags(), token);
        cmd.put_u32(IRQ_STATUS_OFF, 0);
        cmd.put_u8(IRQ_INDEX_OFF, irq_index);
        let rsp = self.submit(cmd)?;
        Ok(rsp.get_u32(IRQ_RSP_STATUS_OFF))
    }

    /// Clears pending causes, write-one-to-clear: a 1 bit in `status` clears
    /// the corresponding pending bit, a 0 bit leaves it unchanged.
    pub fn clear_irq_status(&self, token: Token, irq_index: u8, status: u32) -> CmdResult<()> {
        let mut cmd = Command::new(cmdid::CLEAR_IRQ_STATUS, self.flags(), token);
        cmd.put_u32(IRQ_STATUS_OFF, status);
        cmd.put_u8(IRQ_INDEX_OFF, irq_index);
        self.submit(cmd)?;
        Ok(())
    }
}
