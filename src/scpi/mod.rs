
// Raw-socket SCPI service port used by most bench instruments
pub const DEFAULT_SCPI_PORT:u16 = 5025;

// Read/write termination convention for the line-oriented exchange
pub const TERMINATION:u8 = b'\n';

use std::time::Duration;

use crate::error::TransportError;

// TCP implementation of the command channel
pub mod socket;

// Canned-response transport used to test the controller without hardware
pub mod scripted;

/// One bidirectional command channel to one instrument. Exactly one
/// controller uses a transport at a time; there is no concurrent access.
pub trait Transport {

    /// Send a command with no response expected.
    fn write(&mut self, cmd: &str) -> Result<(), TransportError>;

    /// Send a query and read one termination-delimited response, with the
    /// terminator stripped.
    fn query(&mut self, cmd: &str) -> Result<String, TransportError>;

    /// Bound every subsequent read by `timeout`.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError>;

    /// Close the channel. The first call releases the resource; later calls
    /// return `TransportError::Closed`.
    fn close(&mut self) -> Result<(), TransportError>;

}
