use failure_derive::Fail;

/// Every way a session can fail, from a single flipped wire bit up to the
/// operator pointing at the wrong file.
#[derive(Fail, Debug)]
pub enum Error {
    #[fail(display="SWD ACK {:03b} on request 0x{:02X}", ack, request)]
    WireAck { request: u8, ack: u8 },

    #[fail(display="Parity error on request 0x{:02X}: data 0x{:08X}", request, data)]
    Parity { request: u8, data: u32 },

    #[fail(display="Debug target not supported (ID code 0x{:08X})", found)]
    TargetIdentity { found: u32 },

    #[fail(display="Target connect failed (CTRL/STAT power-up ack not set)")]
    PowerUp,

    #[fail(display="Data mismatch at 0x{:08X} (wrote 0x{:08X}, read 0x{:08X})",
           addr, expected, actual)]
    Verify { addr: u32, expected: u32, actual: u32 },

    #[fail(display="GPIO error: {}", _0)]
    Io(#[cause] std::io::Error),

    #[fail(display="{}", _0)]
    Invariant(&'static str),

    #[fail(display="Load cancelled by operator")]
    Cancelled,
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
