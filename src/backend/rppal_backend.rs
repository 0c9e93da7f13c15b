//! [`PinIO`] backed by `rppal`'s memory-mapped `/dev/gpiomem` access.
//! Unlike the character-device backend, an `IoPin` can flip direction and
//! bias in place, with no re-request needed.

use rppal::gpio::{Gpio, IoPin, Mode, PullUpDown};

use crate::error::Error;
use crate::pin::{Direction, Pull, PinIO};

pub struct RppalPin {
    pin: IoPin,
}

impl RppalPin {
    pub fn open(bcm_pin: u8) -> crate::error::Result<Self> {
        let gpio = Gpio::new().map_err(to_error)?;
        let pin = gpio.get(bcm_pin).map_err(to_error)?.into_io(Mode::Input);
        Ok(RppalPin { pin })
    }
}

impl PinIO for RppalPin {
    fn set_direction(&mut self, dir: Direction, pull: Pull) -> crate::error::Result<()> {
        self.pin.set_mode(match dir {
            Direction::Input => Mode::Input,
            Direction::Output => Mode::Output,
        });
        self.pin.set_pullupdown(match (dir, pull) {
            (Direction::Input, Pull::Up) => PullUpDown::PullUp,
            _ => PullUpDown::Off,
        });
        Ok(())
    }

    fn write(&mut self, level: bool) -> crate::error::Result<()> {
        if level {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }

    fn read(&mut self) -> crate::error::Result<bool> {
        Ok(self.pin.is_high())
    }

    fn release(&mut self) {
        self.pin.set_mode(Mode::Input);
        self.pin.set_pullupdown(PullUpDown::Off);
    }
}

fn to_error(e: rppal::gpio::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}
