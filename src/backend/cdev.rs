//! [`PinIO`] backed by the Linux GPIO character device (`/dev/gpiochipN`),
//! via the `gpio-cdev` crate. Unlike a memory-mapped backend, every
//! direction change here re-requests the line, since `gpio-cdev` fixes a
//! line's direction and bias at request time.

use gpio_cdev::{Chip, Line, LineHandle, LineRequestFlags};

use crate::error::Error;
use crate::pin::{Direction, Pull, PinIO};

const CONSUMER: &str = "swdloader";

pub struct CdevPin {
    line: Line,
    handle: LineHandle,
    direction: Direction,
    pull: Pull,
    level: bool,
}

impl CdevPin {
    /// Open `offset` on the gpiochip at `chip_path`, initially as a
    /// pull-disabled input (the safest default before the caller picks a
    /// direction).
    pub fn open(chip_path: &str, offset: u32) -> crate::error::Result<Self> {
        let mut chip = Chip::new(chip_path).map_err(to_error)?;
        let line = chip.get_line(offset).map_err(to_error)?;
        let handle = line
            .request(LineRequestFlags::INPUT, 0, CONSUMER)
            .map_err(to_error)?;
        Ok(CdevPin { line, handle, direction: Direction::Input, pull: Pull::Off, level: false })
    }
}

impl PinIO for CdevPin {
    fn set_direction(&mut self, dir: Direction, pull: Pull) -> crate::error::Result<()> {
        if dir == self.direction && pull == self.pull {
            return Ok(());
        }
        let mut flags = match dir {
            Direction::Input => LineRequestFlags::INPUT,
            Direction::Output => LineRequestFlags::OUTPUT,
        };
        if dir == Direction::Input {
            flags |= match pull {
                Pull::Up => LineRequestFlags::BIAS_PULL_UP,
                Pull::Off => LineRequestFlags::BIAS_DISABLE,
            };
        }
        let initial = if dir == Direction::Output { self.level as u8 } else { 0 };
        self.handle = self.line.request(flags, initial, CONSUMER).map_err(to_error)?;
        self.direction = dir;
        self.pull = pull;
        Ok(())
    }

    fn write(&mut self, level: bool) -> crate::error::Result<()> {
        self.level = level;
        if self.direction == Direction::Output {
            self.handle.set_value(level as u8).map_err(to_error)?;
        }
        Ok(())
    }

    fn read(&mut self) -> crate::error::Result<bool> {
        Ok(self.handle.get_value().map_err(to_error)? != 0)
    }

    fn release(&mut self) {
        let _ = self.set_direction(Direction::Input, Pull::Off);
    }
}

fn to_error(e: gpio_cdev::errors::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}
