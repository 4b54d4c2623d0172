
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::str;
use std::time::Duration;

use crate::error::TransportError;
use crate::scpi::{Transport, DEFAULT_SCPI_PORT, TERMINATION};

/// Line-oriented SCPI exchange over a raw TCP socket.
pub struct ScpiSocket {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    closed: bool,
}

impl ScpiSocket {

    /// Connect to `addr`, given as `host` or `host:port`; the raw SCPI port
    /// is assumed when none is given. Reads are bounded by `timeout`.
    pub fn connect(addr:&str, timeout:Duration) -> Result<Self, TransportError> {
        let addr:String = if addr.contains(':') {
            addr.to_owned()
        } else {
            format!("{}:{}", addr, DEFAULT_SCPI_PORT)
        };

        let stream = TcpStream::connect(addr.as_str())?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let reader = BufReader::new(stream.try_clone()?);

        Ok(Self { stream, reader, closed: false })
    }

}

impl Transport for ScpiSocket {

    fn write(&mut self, cmd:&str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.stream.write_all(cmd.as_bytes())?;
        self.stream.write_all(&[TERMINATION])?;
        Ok(())
    }

    fn query(&mut self, cmd:&str) -> Result<String, TransportError> {
        self.write(cmd)?;

        let mut buff:Vec<u8> = vec![];
        match self.reader.read_until(TERMINATION, &mut buff) {
            Ok(0) => return Err(TransportError::Io(ErrorKind::UnexpectedEof.into())),
            Ok(_) => (),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                return Err(TransportError::Timeout);
            },
            Err(e) => return Err(TransportError::Io(e)),
        }

        let text = str::from_utf8(&buff).map_err(|_| TransportError::NotUtf8)?;
        Ok(text.trim_end_matches(|c| c == '\n' || c == '\r').to_owned())
    }

    fn set_timeout(&mut self, timeout:Duration) -> Result<(), TransportError> {
        self.stream.set_read_timeout(Some(timeout))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.closed = true;
        self.stream.shutdown(Shutdown::Both)?;
        Ok(())
    }

}
