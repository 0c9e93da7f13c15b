//! Session lifecycle: pin acquisition, optional hardware reset pulse, and
//! teardown on every exit path — success, error return, or a signal-driven
//! abort.

use std::sync::atomic::AtomicBool;
use std::thread::sleep;
use std::time::Duration;

use tracing::info;

use crate::bitbang::BitBang;
use crate::error::Result;
use crate::loader::{Loader, LoadReport, Phase};
use crate::pin::{Direction, Pull, PinIO};

const RESET_PULSE: Duration = Duration::from_millis(10);

/// A single SWD session: CLK (always output), DIO (bidirectional), and an
/// optional active-low RESET. Not `Send`/`Sync` — the bus is strictly
/// serial and a session owns its pins exclusively from construction to
/// drop.
pub struct Session<P: PinIO> {
    loader: Option<Loader<BitBang<P, P>>>,
    reset: Option<P>,
}

impl<P: PinIO> Session<P> {
    pub fn new(clk: P, dio: P, reset: Option<P>, khz: u32) -> Result<Self> {
        let reset = match reset {
            Some(mut r) => {
                // Anti-spike: record HIGH while the line is still input, so
                // the switch to output restores an already-recorded level
                // instead of defaulting low for one request cycle.
                r.set_direction(Direction::Input, Pull::Up)?;
                r.write(true)?;
                r.set_direction(Direction::Output, Pull::Off)?;
                Some(r)
            }
            None => None,
        };
        let bitbang = BitBang::new(clk, dio, khz)?;
        Ok(Session { loader: Some(Loader::new(bitbang)), reset })
    }

    pub fn reset_available(&self) -> bool {
        self.reset.is_some()
    }

    fn pulse_reset(&mut self) -> Result<()> {
        if let Some(reset) = self.reset.as_mut() {
            info!("pulsing RESET");
            reset.write(false)?;
            sleep(RESET_PULSE);
            reset.write(true)?;
            sleep(RESET_PULSE);
        }
        Ok(())
    }

    /// Pulse reset (if available), bring the target up, then halt/quiesce/
    /// load/verify/start the image. `cancel` is polled between blocks.
    pub fn run_load(
        &mut self,
        image: &[u8],
        addr: u32,
        instance: u8,
        cancel: Option<&AtomicBool>,
        on_block: impl FnMut(u32),
        on_phase: impl FnMut(Phase),
    ) -> Result<LoadReport> {
        self.pulse_reset()?;
        let loader = self.loader.as_mut().expect("loader present for session lifetime");
        loader.bring_up(instance)?;
        loader.load(image, addr, cancel, on_block, on_phase)
    }
}

impl<P: PinIO> Drop for Session<P> {
    fn drop(&mut self) {
        if let Some(loader) = self.loader.take() {
            let bitbang = loader.into_link();
            let (mut clk, mut dio) = bitbang.into_pins();
            clk.release();
            dio.release();
        }
        // RESET is deliberately left driven high, not released to input:
        // an input line can float or be pulled low externally, which would
        // hold the target in reset after we exit.
        if let Some(reset) = self.reset.as_mut() {
            let _ = reset.write(true);
        }
    }
}
