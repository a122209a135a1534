//! Blocking TCP transport over `std::net`.
//!
//! Reads block for at most the configured timeout. [`Read::ready`] peeks the
//! socket in non-blocking mode so the MQTT poll stays non-blocking when no
//! data is waiting.

use super::error::Error;
use super::{Close, Connect, Connection, Read, Write};
use std::io::{ErrorKind, Read as StdRead, Write as StdWrite};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// A connected TCP stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl Read for TcpConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.stream.read(buf) {
            Ok(0) if !buf.is_empty() => Err(Error::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(Error::Timeout)
            }
            Err(_) => Err(Error::ReadError),
        }
    }

    fn ready(&mut self) -> Result<bool, Self::Error> {
        self.stream
            .set_nonblocking(true)
            .map_err(|_| Error::ReadError)?;
        let mut byte = [0u8; 1];
        let peeked = self.stream.peek(&mut byte);
        self.stream
            .set_nonblocking(false)
            .map_err(|_| Error::ReadError)?;

        match peeked {
            Ok(0) => Err(Error::ConnectionClosed),
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(_) => Err(Error::ReadError),
        }
    }
}

impl Write for TcpConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream.write(buf).map_err(|_| Error::WriteError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for TcpConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.stream
            .shutdown(Shutdown::Both)
            .map_err(|_| Error::ConnectionClosed)
    }
}

impl Connection for TcpConnection {}

/// Opens [`TcpConnection`]s with a fixed read timeout.
#[derive(Debug, Clone, Copy)]
pub struct TcpNetwork {
    read_timeout: Duration,
}

impl TcpNetwork {
    /// Create a connector whose connections time out reads after `read_timeout`.
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Default for TcpNetwork {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Connect for TcpNetwork {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        let stream = TcpStream::connect(remote).map_err(|e| match e.kind() {
            ErrorKind::ConnectionRefused => Error::ConnectionRefused,
            ErrorKind::TimedOut => Error::Timeout,
            ErrorKind::InvalidInput => Error::InvalidAddress,
            _ => Error::NotOpen,
        })?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(|_| Error::NotOpen)?;
        stream.set_nodelay(true).map_err(|_| Error::NotOpen)?;
        Ok(TcpConnection { stream })
    }
}
