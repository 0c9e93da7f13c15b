//! Abstract digital I/O line: the only interface the core needs from the
//! host's GPIO layer. Concrete backends live under `backend/`.

use crate::error::Result;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pull {
    Off,
    Up,
}

/// A single digital line identified (by the backend) with an opaque selector.
///
/// `set_direction` is idempotent when the requested direction and pull
/// already hold; implementors must not re-init the line in that case, since
/// reconfiguring a line that is mid-drive can glitch it low or high for a
/// few nanoseconds.
pub trait PinIO {
    fn set_direction(&mut self, dir: Direction, pull: Pull) -> Result<()>;
    fn write(&mut self, level: bool) -> Result<()>;
    fn read(&mut self) -> Result<bool>;

    /// Return the pin to input, pull disabled. Called on session teardown;
    /// must not fail loudly since it runs during unwind/drop.
    fn release(&mut self);
}
