//! One SWD request: header byte, turnaround, 3-bit ACK, 32-bit payload,
//! parity. This is the layer that knows about ACK codes and odd parity; it
//! knows nothing about what a request byte *means*.

use crate::error::{Error, Result};
use crate::link::WireLink;

/// Turnaround period, in clock cycles, at every direction change.
const TURN: u8 = 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Ack {
    Ok,
    Wait,
    Fault,
    Unknown(u8),
}

impl Ack {
    fn decode(bits: u32) -> Self {
        match bits as u8 {
            0b001 => Ack::Ok,
            0b010 => Ack::Wait,
            0b100 => Ack::Fault,
            other => Ack::Unknown(other),
        }
    }
}

/// Odd parity: the XOR-fold of all set bits in `data`.
fn parity(data: u32) -> u32 {
    data.count_ones() & 1
}

/// Wraps a [`WireLink`] with the SWD request/ACK/parity protocol. Generic
/// over the link so tests can substitute a scripted target with no GPIO
/// involved at all.
pub struct SWDFrame<L> {
    link: L,
}

impl<L: WireLink> SWDFrame<L> {
    pub fn new(link: L) -> Self {
        SWDFrame { link }
    }

    pub fn into_link(self) -> L {
        self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Begin or end a transaction: both are the same idle bracket, so the
    /// bus returns to a known state (CLK low, DIO driven low) regardless of
    /// what came before.
    pub fn idle(&mut self, n: u8) -> Result<()> {
        self.link.idle(n)
    }

    pub fn write_request(&mut self, req: u8, data: u32) -> Result<()> {
        self.link.write_bits(req as u32, 8)?;
        self.link.read_bits(1 + TURN)?; // park bit (not driven) + turnaround
        let ack = Ack::decode(self.link.read_bits(3)?);
        self.link.read_bits(TURN)?;
        if ack != Ack::Ok {
            self.idle(8)?;
            return Err(Error::WireAck { request: req, ack: ack_code(ack) });
        }
        self.link.write_bits(data, 32)?;
        self.link.write_bits(parity(data), 1)?;
        Ok(())
    }

    pub fn read_request(&mut self, req: u8) -> Result<u32> {
        self.link.write_bits(req as u32, 8)?;
        self.link.read_bits(1 + TURN)?;
        let ack = Ack::decode(self.link.read_bits(3)?);
        if ack != Ack::Ok {
            self.link.read_bits(TURN)?;
            self.idle(8)?;
            return Err(Error::WireAck { request: req, ack: ack_code(ack) });
        }
        let data = self.link.read_bits(32)?;
        let p = self.link.read_bits(1)?;
        if p != parity(data) {
            self.link.read_bits(TURN)?;
            self.idle(8)?;
            return Err(Error::Parity { request: req, data });
        }
        self.link.read_bits(TURN)?;
        Ok(data)
    }
}

fn ack_code(ack: Ack) -> u8 {
    match ack {
        Ack::Ok => 0b001,
        Ack::Wait => 0b010,
        Ack::Fault => 0b100,
        Ack::Unknown(v) => v,
    }
}
