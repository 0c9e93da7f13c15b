//! Debug Port and Memory-Access Port vocabulary: the named registers and
//! requests a Cortex-M loader actually issues, built on top of the raw
//! request/ACK frame layer.

use crate::error::{Error, Result};
use crate::frame::SWDFrame;
use crate::link::WireLink;

// Request bytes already encode start(1)/APnDP/RnW/A[3:2]/parity/stop(0)/park(1),
// transmitted LSB first.
pub const WR_DP_ABORT: u8 = 0x81;
pub const RD_DP_CTRL_STAT: u8 = 0x8D;
pub const WR_DP_CTRL_STAT: u8 = 0xA9;
pub const RD_DP_DPIDR: u8 = 0xA5;
pub const RD_DP_RDBUFF: u8 = 0xBD;
pub const WR_DP_SELECT: u8 = 0xB1;
pub const WR_DP_TARGETSEL: u8 = 0x99;
pub const WR_AP_CSW: u8 = 0xA3;
pub const RD_AP_DRW: u8 = 0x9F;
pub const WR_AP_DRW: u8 = 0xBB;
pub const WR_AP_TAR: u8 = 0x8B;

pub const DP_ABORT_STKCMPCLR: u32 = 1 << 1;
pub const DP_ABORT_STKERRCLR: u32 = 1 << 2;
pub const DP_ABORT_WDERRCLR: u32 = 1 << 3;
pub const DP_ABORT_ORUNERRCLR: u32 = 1 << 4;

pub const DP_CTRL_STAT_ORUNDETECT: u32 = 1 << 0;
pub const DP_CTRL_STAT_STICKYERR: u32 = 1 << 5;
pub const DP_CTRL_STAT_CDBGPWRUPREQ: u32 = 1 << 28;
pub const DP_CTRL_STAT_CDBGPWRUPACK: u32 = 1 << 29;
pub const DP_CTRL_STAT_CSYSPWRUPREQ: u32 = 1 << 30;
pub const DP_CTRL_STAT_CSYSPWRUPACK: u32 = 1 << 31;

pub const DP_SELECT_DEFAULT: u32 = 0; // DP bank 0, AP 0, AP bank 0
pub const DP_DPIDR_SUPPORTED: u32 = 0x0BC1_2477;
pub const DP_TARGETSEL_CPUAPID_SUPPORTED: u32 = 0x0100_2927;
pub const DP_TARGETSEL_TINSTANCE_SHIFT: u32 = 28;

pub const AP_CSW_SIZE_32BITS: u32 = 2;
pub const AP_CSW_ADDR_INC_SINGLE: u32 = 1 << 4;
pub const AP_CSW_DEVICE_EN: u32 = 1 << 6;
pub const AP_CSW_PROT_DEFAULT: u32 = 0x22 << 24;
pub const AP_CSW_DBG_SW_ENABLE: u32 = 1 << 31;

/// Debug Port / Memory-AP operations, generic over the wire link so the
/// same logic drives a real bit-banged bus or a scripted mock.
pub struct DPAP<L> {
    frame: SWDFrame<L>,
}

impl<L: WireLink> DPAP<L> {
    pub fn new(link: L) -> Self {
        DPAP { frame: SWDFrame::new(link) }
    }

    pub fn into_link(self) -> L {
        self.frame.into_link()
    }

    /// Raw bit-level access for the bring-up sequences (dormant exit, line
    /// reset, target select) that don't follow the request/ACK shape.
    pub fn link_mut(&mut self) -> &mut L {
        self.frame.link_mut()
    }

    pub fn idle(&mut self, n: u8) -> Result<()> {
        self.frame.idle(n)
    }

    pub fn write_dp(&mut self, req: u8, value: u32) -> Result<()> {
        self.frame.write_request(req, value)
    }

    pub fn read_dp(&mut self, req: u8) -> Result<u32> {
        self.frame.read_request(req)
    }

    pub fn write_ap(&mut self, req: u8, value: u32) -> Result<()> {
        self.frame.write_request(req, value)
    }

    pub fn read_ap(&mut self, req: u8) -> Result<u32> {
        self.frame.read_request(req)
    }

    /// Memory write: arm TAR then push the word through DRW. Auto-increment
    /// is configured once in CSW by the loader, so repeated calls at
    /// successive addresses don't need a fresh TAR each time.
    pub fn write_mem(&mut self, addr: u32, word: u32) -> Result<()> {
        self.write_ap(WR_AP_TAR, addr)?;
        self.write_ap(WR_AP_DRW, word)
    }

    /// Memory read. AP reads are posted: the DRW read returns the *previous*
    /// buffered value, and RDBUFF is what actually carries the word we
    /// asked for.
    pub fn read_mem(&mut self, addr: u32) -> Result<u32> {
        self.write_ap(WR_AP_TAR, addr)?;
        self.read_ap(RD_AP_DRW)?;
        self.read_dp(RD_DP_RDBUFF)
    }

    /// Target select (DPv2 multi-drop): this request produces no ACK at
    /// all, just a turnaround and five undriven cycles, before the 32-bit
    /// target word and its parity.
    pub fn select_target(&mut self, cpuapid: u32, instance: u8) -> Result<()> {
        let word = cpuapid | ((instance as u32) << DP_TARGETSEL_TINSTANCE_SHIFT);
        let link = self.link_mut();
        link.write_bits(WR_DP_TARGETSEL as u32, 8)?;
        link.read_bits(1 + 5)?; // park bit + 5 cycles not driven
        link.write_bits(word, 32)?;
        link.write_bits(word.count_ones() & 1, 1)?;
        Ok(())
    }

    /// Clear sticky errors, select DP bank 0 / AP 0 / AP bank 0, request
    /// debug and system power-up, and confirm both acks landed.
    pub fn power_up(&mut self) -> Result<()> {
        self.write_dp(
            WR_DP_ABORT,
            DP_ABORT_STKCMPCLR | DP_ABORT_STKERRCLR | DP_ABORT_WDERRCLR
                | DP_ABORT_ORUNERRCLR,
        )?;
        self.write_dp(WR_DP_SELECT, DP_SELECT_DEFAULT)?;
        self.write_dp(
            WR_DP_CTRL_STAT,
            DP_CTRL_STAT_ORUNDETECT | DP_CTRL_STAT_STICKYERR
                | DP_CTRL_STAT_CDBGPWRUPREQ | DP_CTRL_STAT_CSYSPWRUPREQ,
        )?;
        let ctrl_stat = self.read_dp(RD_DP_CTRL_STAT)?;
        let acked = ctrl_stat & DP_CTRL_STAT_CDBGPWRUPACK != 0
            && ctrl_stat & DP_CTRL_STAT_CSYSPWRUPACK != 0;
        if !acked {
            return Err(Error::PowerUp);
        }
        Ok(())
    }
}
