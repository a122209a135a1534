//! Reconnectable MQTT broker session.

use core::fmt::Write as _;

use heapless::String;
use log::{debug, warn};

use super::client::{Client, Options, PublishPacket, QoS};
use crate::network::Connect;
use crate::network::error::Error;
use crate::node::config::{Credentials, Endpoint};
use crate::node::{Broker, Publish};

/// A broker session that survives transport loss.
///
/// Each [`connect`](Broker::connect) opens a fresh transport connection to
/// the configured endpoint and performs a clean-session handshake. Any
/// transport failure marks the session closed, so the supervisor sees
/// [`is_connected`](Broker::is_connected) go false and reconnects.
pub struct MqttSession<'c, N: Connect> {
    network: N,
    endpoint: &'c Endpoint,
    keep_alive_seconds: u16,
    client: Option<Client<N::Connection>>,
}

impl<N> core::fmt::Debug for MqttSession<'_, N>
where
    N: Connect,
    N::Error: Into<Error>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MqttSession")
            .field("host", &self.endpoint.host)
            .field("port", &self.endpoint.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl<'c, N: Connect> MqttSession<'c, N> {
    /// Create a closed session for `endpoint`.
    pub fn new(network: N, endpoint: &'c Endpoint, keep_alive_seconds: u16) -> Self {
        Self {
            network,
            endpoint,
            keep_alive_seconds,
            client: None,
        }
    }

    /// Send DISCONNECT and drop the transport, if a session is open.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        match self.client.take() {
            Some(client) => client.disconnect(),
            None => Ok(()),
        }
    }

    /// Send a keep-alive ping on the open session.
    pub fn ping(&mut self) -> Result<(), Error> {
        self.client_mut()?.ping()
    }

    fn client_mut(&mut self) -> Result<&mut Client<N::Connection>, Error> {
        self.client.as_mut().ok_or(Error::NotConnected)
    }

    fn remote(&self) -> Result<String<72>, Error> {
        let mut remote = String::new();
        write!(remote, "{}:{}", self.endpoint.host, self.endpoint.port)
            .map_err(|_| Error::InvalidAddress)?;
        Ok(remote)
    }
}

impl<N: Connect> Publish for MqttSession<'_, N> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Error> {
        self.client_mut()?.publish(topic, payload, QoS::AtMostOnce)
    }
}

impl<N> Broker for MqttSession<'_, N>
where
    N: Connect,
    N::Error: Into<Error>,
{
    fn connect(&mut self, client_id: &str, credentials: &Credentials) -> Result<(), Error> {
        // A stale client may still hold a half-open socket.
        self.client = None;

        let remote = self.remote()?;
        let connection = self.network.connect(&remote).map_err(|e| {
            let e: Error = e.into();
            warn!("TCP connection to {} failed: {}", remote, e);
            e
        })?;

        let options = Options {
            client_id,
            username: non_empty(&credentials.username),
            password: non_empty(&credentials.password),
            keep_alive_seconds: self.keep_alive_seconds,
            clean_session: true,
        };
        let client = Client::connect(connection, options)?;
        debug!("MQTT session open on {}", remote);
        self.client = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.is_connected())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.client_mut()?.subscribe(topic, QoS::AtMostOnce)
    }

    fn poll(&mut self) -> Result<Option<PublishPacket>, Error> {
        self.client_mut()?.poll()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}
