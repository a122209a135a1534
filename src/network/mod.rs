//! Transport abstraction for the lab node.
//!
//! The node never talks to a socket or a radio directly. It consumes a small
//! set of traits: byte-stream [`Connection`]s opened by a [`Connect`]or, and a
//! WiFi [`Station`] that reports and initiates association with an access
//! point. Firmware provides the implementations; tests provide mocks.

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Application layer protocols (MQTT)
pub mod application;

/// `std::net` transport for hosted targets
#[cfg(feature = "std")]
pub mod tcp;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Station, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection.
    ///
    /// Returning `Ok(0)` means no data is available right now.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
    /// Whether a read would make progress without blocking.
    ///
    /// Transports whose `read` already returns `Ok(0)` when idle can keep the
    /// default. Blocking transports override this so callers can poll.
    fn ready(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection to `remote` (`host:port`)
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

/// A WiFi station interface.
///
/// Only the operations the connection supervisor needs are modelled: the
/// association state, a way to start associating, and the hardware address
/// used to derive a stable MQTT client id.
pub trait Station {
    /// Whether the station is currently associated with an access point.
    fn is_associated(&mut self) -> bool;
    /// Start associating with `ssid`. Completion is observed through
    /// [`is_associated`](Station::is_associated).
    fn associate(&mut self, ssid: &str, password: &str);
    /// The station MAC address.
    fn mac_address(&self) -> [u8; 6];
}
