//! Target bring-up, halt, chunked RAM write with verify, and start: the
//! state machine that turns a raw SWD link into "the image is running".

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::dpap::{
    self, DPAP, DP_DPIDR_SUPPORTED, DP_TARGETSEL_CPUAPID_SUPPORTED,
};
use crate::error::{Error, Result};
use crate::link::WireLink;

// ARMv6-M debug system registers.
const DHCSR: u32 = 0xE000_EDF0;
const DHCSR_C_DEBUGEN: u32 = 1 << 0;
const DHCSR_C_HALT: u32 = 1 << 1;
const DHCSR_DBGKEY_SHIFT: u32 = 16;
const DHCSR_DBGKEY: u32 = 0xA05F;
const DCRSR: u32 = 0xE000_EDF4;
const DCRSR_REGSEL_R15: u32 = 15;
const DCRSR_REGW_N_R: u32 = 1 << 16;
const DCRDR: u32 = 0xE000_EDF8;

// RP2040 bus masters that must be quiesced before writing SRAM.
const XIP_CNTL: u32 = 0x1400_0000;
const USB_CNTL: u32 = 0x5011_0040;

const BLOCK_SIZE: usize = 1024;

/// Bytes loaded, time taken, and derived throughput for a completed load.
#[derive(Copy, Clone, Debug)]
pub struct LoadReport {
    pub bytes: usize,
    pub seconds: f64,
}

impl LoadReport {
    pub fn kib_per_sec(&self) -> f64 {
        if self.seconds <= 0.0 {
            return 0.0;
        }
        (self.bytes as f64 / 1024.0) / self.seconds
    }
}

pub struct Loader<L> {
    dpap: DPAP<L>,
}

impl<L: WireLink> Loader<L> {
    pub fn new(link: L) -> Self {
        Loader { dpap: DPAP::new(link) }
    }

    pub fn into_link(self) -> L {
        self.dpap.into_link()
    }

    /// Dormant-to-SWD wakeup, line reset, multi-drop target select, DPIDR
    /// identify, and the debug/system power-up handshake. One transaction
    /// from idle to idle.
    pub fn bring_up(&mut self, instance: u8) -> Result<()> {
        self.dpap.idle(8)?;
        self.dormant_to_swd()?;
        self.dpap.idle(8)?;
        self.line_reset()?;
        self.dpap.select_target(DP_TARGETSEL_CPUAPID_SUPPORTED, instance)?;

        let idcode = self.dpap.read_dp(dpap::RD_DP_DPIDR)?;
        if idcode != DP_DPIDR_SUPPORTED {
            self.dpap.idle(8)?;
            return Err(Error::TargetIdentity { found: idcode });
        }
        debug!(idcode = format!("{:#010x}", idcode), "target identified");

        if let Err(e) = self.dpap.power_up() {
            self.dpap.idle(8)?;
            return Err(e);
        }
        self.dpap.idle(8)?;
        info!("target power-up acknowledged");
        Ok(())
    }

    fn dormant_to_swd(&mut self) -> Result<()> {
        let link = self.dpap.link_mut();
        link.write_bits(0xFF, 8)?; // 8 cycles high
        link.write_bits(0x6209_F392, 32)?; // selection alert sequence
        link.write_bits(0x8685_2D95, 32)?;
        link.write_bits(0xE3DD_AFE9, 32)?;
        link.write_bits(0x19BC_0EA2, 32)?;
        link.write_bits(0x0, 4)?; // 4 cycles low
        link.write_bits(0x1A, 8)?; // activation code
        Ok(())
    }

    /// >=50 cycles high, then >=2 cycles low. Resolves the original's
    /// ambiguous 32+28 split by emitting the conservative 52 ones / 4 zeros
    /// explicitly (see DESIGN.md).
    fn line_reset(&mut self) -> Result<()> {
        let link = self.dpap.link_mut();
        link.write_bits(0xFFFF_FFFF, 32)?;
        link.write_bits(0xFFFF_FFFF, 20)?; // 52 ones total
        link.write_bits(0x0, 4)?;
        Ok(())
    }

    /// Arm 32-bit auto-increment access on the MEM-AP, then halt the core
    /// via DHCSR.
    pub fn halt(&mut self) -> Result<()> {
        self.dpap.idle(8)?;
        let csw = dpap::AP_CSW_SIZE_32BITS
            | dpap::AP_CSW_ADDR_INC_SINGLE
            | dpap::AP_CSW_DEVICE_EN
            | dpap::AP_CSW_PROT_DEFAULT
            | dpap::AP_CSW_DBG_SW_ENABLE;
        self.dpap.write_ap(dpap::WR_AP_CSW, csw)?;
        self.dpap
            .write_mem(DHCSR, DHCSR_C_DEBUGEN | DHCSR_C_HALT | (DHCSR_DBGKEY << DHCSR_DBGKEY_SHIFT))?;
        self.dpap.idle(8)?;
        info!("target halted");
        Ok(())
    }

    /// Disable the XIP cache controller and USB controller so neither can
    /// race the upcoming SRAM write with its own bus master.
    fn quiesce(&mut self) -> Result<()> {
        self.dpap.idle(8)?;
        self.dpap.write_mem(XIP_CNTL, 0)?;
        self.dpap.idle(8)?;
        self.dpap.write_mem(USB_CNTL, 0)?;
        self.dpap.idle(8)?;
        debug!("XIP and USB quiesced");
        Ok(())
    }

    /// Write `image` to `addr` in 1 KiB blocks, verifying the first word of
    /// each block immediately after the block's writes land. `cancel`, if
    /// set, is polled between blocks (never mid-block: tearing the bus down
    /// mid-bit is undefined for the target).
    pub fn load_chunk(
        &mut self,
        image: &[u8],
        addr: u32,
        cancel: Option<&AtomicBool>,
        mut on_block: impl FnMut(u32),
    ) -> Result<()> {
        let mut addr = addr;
        for block in image.chunks(BLOCK_SIZE) {
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    return Err(Error::Cancelled);
                }
            }
            on_block(addr);
            let first_word = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);

            self.dpap.idle(8)?;
            self.dpap.write_ap(dpap::WR_AP_TAR, addr)?;
            for word in block.chunks_exact(4) {
                let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                self.dpap.write_ap(dpap::WR_AP_DRW, value)?;
            }
            self.dpap.idle(8)?;

            self.dpap.idle(8)?;
            let readback = self.dpap.read_mem(addr)?;
            self.dpap.idle(8)?;

            if readback != first_word {
                return Err(Error::Verify { addr, expected: first_word, actual: readback });
            }
            trace!(addr = format!("{:#010x}", addr), "block verified");

            addr += block.len() as u32;
        }
        Ok(())
    }

    /// Write PC from DCRDR and clear C_HALT, leaving debug enabled.
    pub fn start(&mut self, addr: u32) -> Result<()> {
        self.dpap.idle(8)?;
        self.dpap.write_mem(DCRDR, addr)?;
        self.dpap
            .write_mem(DCRSR, (DCRSR_REGSEL_R15 << 0) | DCRSR_REGW_N_R)?;
        self.dpap
            .write_mem(DHCSR, DHCSR_C_DEBUGEN | (DHCSR_DBGKEY << DHCSR_DBGKEY_SHIFT))?;
        self.dpap.idle(8)?;
        info!(addr = format!("{:#010x}", addr), "target started");
        Ok(())
    }

    /// Halt, quiesce, load, and start. Returns the report the CLI prints.
    /// `on_phase` fires once per major step so a caller can print operator
    /// progress ("Disabling XIP and USB", "Starting") without this loader
    /// knowing anything about stdout.
    pub fn load(
        &mut self,
        image: &[u8],
        addr: u32,
        cancel: Option<&AtomicBool>,
        on_block: impl FnMut(u32),
        mut on_phase: impl FnMut(Phase),
    ) -> Result<LoadReport> {
        if image.is_empty() || image.len() % 4 != 0 {
            return Err(Error::Invariant("image size must be a non-zero multiple of 4"));
        }
        self.halt()?;
        let start = Instant::now();
        on_phase(Phase::Quiescing);
        self.quiesce()?;
        self.load_chunk(image, addr, cancel, on_block)?;
        let seconds = start.elapsed().as_secs_f64();
        on_phase(Phase::Starting);
        self.start(addr)?;
        if seconds <= 0.0 {
            warn!("load completed in effectively zero measured time");
        }
        Ok(LoadReport { bytes: image.len(), seconds })
    }
}

/// Major phases of a full load, reported to the caller for operator
/// progress messages.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Quiescing,
    Starting,
}
