//! Clocked bidirectional bit stream over (CLK, DIO), bit-banged from
//! userspace. Half-period timing is a busy-wait: at the sub-microsecond
//! periods this protocol runs at, a kernel sleep would dominate and slow
//! the bus by orders of magnitude.

use std::time::Instant;

use crate::error::Result;
use crate::link::WireLink;
use crate::pin::{Direction, Pull, PinIO};

fn busy_wait_ns(ns: u32) {
    if ns == 0 {
        return;
    }
    let start = Instant::now();
    let target = std::time::Duration::from_nanos(ns as u64);
    while start.elapsed() < target {
        std::hint::spin_loop();
    }
}

/// Bit-banged SWD physical layer over two GPIO lines.
pub struct BitBang<C, D> {
    clk: C,
    dio: D,
    half_period_ns: u32,
}

impl<C: PinIO, D: PinIO> BitBang<C, D> {
    /// `khz` is the target SWCLK rate; the half-period is derived per the
    /// protocol's `500_000 / khz` nanosecond rule.
    pub fn new(clk: C, dio: D, khz: u32) -> Result<Self> {
        let mut bb = BitBang { clk, dio, half_period_ns: 500_000 / khz.max(1) };
        bb.clk.set_direction(Direction::Output, Pull::Off)?;
        bb.clk.write(false)?;
        Ok(bb)
    }

    pub fn into_pins(self) -> (C, D) {
        (self.clk, self.dio)
    }

    /// CLK low, wait, CLK high, wait. The target samples DIO on the rising
    /// edge, so DIO must already be stable before this call returns from
    /// the low phase.
    fn clock_cycle(&mut self) -> Result<()> {
        self.clk.write(false)?;
        busy_wait_ns(self.half_period_ns);
        self.clk.write(true)?;
        busy_wait_ns(self.half_period_ns);
        Ok(())
    }
}

impl<C: PinIO, D: PinIO> WireLink for BitBang<C, D> {
    fn write_bits(&mut self, value: u32, n: u8) -> Result<()> {
        self.dio.set_direction(Direction::Output, Pull::Off)?;
        let mut value = value;
        for _ in 0..n {
            self.dio.write(value & 1 != 0)?;
            self.clock_cycle()?;
            value >>= 1;
        }
        Ok(())
    }

    fn read_bits(&mut self, n: u8) -> Result<u32> {
        self.dio.set_direction(Direction::Input, Pull::Up)?;
        let mut bits = 0u32;
        for i in 0..n {
            let level = self.dio.read()?;
            self.clock_cycle()?;
            if level {
                bits |= 1 << i;
            }
        }
        Ok(bits)
    }

    fn idle(&mut self, n: u8) -> Result<()> {
        self.write_bits(0, n)?;
        self.clk.write(false)?;
        self.dio.set_direction(Direction::Output, Pull::Off)?;
        self.dio.write(false)?;
        Ok(())
    }
}
