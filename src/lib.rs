//! Host-side SWD loader for the RP2040: bit-banged physical layer, DP/MEM-AP
//! transaction layer, and the bring-up/halt/load/verify/start state machine
//! that puts an image into RAM and runs it.
//!
//! The crate is organized leaf-first: [`pin`] is the abstract GPIO
//! capability, [`bitbang`] clocks bits over it, [`frame`] wraps that in the
//! SWD request/ACK/parity protocol, [`dpap`] adds the named DP/AP
//! vocabulary, [`loader`] is the RP2040-specific state machine, and
//! [`session`] owns the pins end to end. Concrete GPIO backends live under
//! [`backend`] and are never named by the core.

pub mod backend;
pub mod bitbang;
pub mod dpap;
pub mod error;
pub mod frame;
pub mod link;
pub mod loader;
pub mod pin;
pub mod session;

pub use error::{Error, Result};
pub use loader::{LoadReport, Phase};
pub use session::Session;

/// RP2040 SRAM base address: the only load address this loader targets.
pub const RAM_BASE: u32 = 0x2000_0000;
