//! WiFi association and broker session lifecycle.

use core::fmt::Write as _;

use heapless::String;
use log::{info, warn};

use super::config::{Config, MAX_PREFIX_LEN};
use super::retry::{FixedDelay, RetryPolicy};
use super::{Broker, Error};
use crate::hal::Delay;
use crate::network::Station;

/// Capacity of the MQTT client id: the prefix plus a formatted MAC address.
pub const MAX_CLIENT_ID_LEN: usize = MAX_PREFIX_LEN + 17;

/// Link state as last observed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable link.
    Disconnected,
    /// Association or broker connection in progress.
    Connecting,
    /// Associated, session open and subscriptions sent.
    Connected,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConnectionState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConnectionState::Disconnected => defmt::write!(f, "Disconnected"),
            ConnectionState::Connecting => defmt::write!(f, "Connecting"),
            ConnectionState::Connected => defmt::write!(f, "Connected"),
        }
    }
}

/// Keeps the station associated and the broker session open.
///
/// [`ensure_connected`](Self::ensure_connected) is the only blocking call in
/// the node. It waits through the injected [`Delay`], asking the
/// [`RetryPolicy`] how long to sleep after each failed attempt. With the
/// default [`FixedDelay`] it retries forever, so a wrong password keeps the
/// node in this call indefinitely.
pub struct ConnectionSupervisor<'c, S, B, D, R = FixedDelay>
where
    S: Station,
    B: Broker,
    D: Delay,
    R: RetryPolicy,
{
    config: &'c Config,
    station: S,
    broker: B,
    delay: D,
    wifi_retry: R,
    broker_retry: R,
    state: ConnectionState,
    client_id: String<MAX_CLIENT_ID_LEN>,
}

impl<S, B, D, R> core::fmt::Debug for ConnectionSupervisor<'_, S, B, D, R>
where
    S: Station,
    B: Broker,
    D: Delay,
    R: RetryPolicy,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("client_id", &self.client_id)
            .field("state", &self.state)
            .finish()
    }
}

impl<'c, S, B, D> ConnectionSupervisor<'c, S, B, D, FixedDelay>
where
    S: Station,
    B: Broker,
    D: Delay,
{
    /// Supervisor with the fixed retry delays from `config.timing`.
    pub fn new(config: &'c Config, station: S, broker: B, delay: D) -> Self {
        let wifi_retry = FixedDelay::new(config.timing.wifi_retry_ms);
        let broker_retry = FixedDelay::new(config.timing.broker_retry_ms);
        Self::with_retry(config, station, broker, delay, wifi_retry, broker_retry)
    }
}

impl<'c, S, B, D, R> ConnectionSupervisor<'c, S, B, D, R>
where
    S: Station,
    B: Broker,
    D: Delay,
    R: RetryPolicy,
{
    /// Supervisor with explicit retry policies for association polling and
    /// broker connection attempts.
    pub fn with_retry(
        config: &'c Config,
        station: S,
        broker: B,
        delay: D,
        wifi_retry: R,
        broker_retry: R,
    ) -> Self {
        let client_id = client_id(&config.client_id_prefix, station.mac_address());
        Self {
            config,
            station,
            broker,
            delay,
            wifi_retry,
            broker_retry,
            state: ConnectionState::Disconnected,
            client_id,
        }
    }

    /// Bring the link up if it is down.
    ///
    /// Returns immediately when the station is associated and the session is
    /// open. After every new broker session all inbound topics are
    /// subscribed again before this returns, so no message is routed on a
    /// session that lacks its subscriptions. A failed subscription is logged
    /// and does not fail the call.
    pub fn ensure_connected(&mut self) -> Result<(), Error> {
        if !self.station.is_associated() {
            self.state = ConnectionState::Connecting;
            self.associate()?;
        }

        if !self.broker.is_connected() {
            self.state = ConnectionState::Connecting;
            self.open_session()?;
            self.resubscribe();
        }

        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn associate(&mut self) -> Result<(), Error> {
        let config = self.config;
        let wifi = &config.wifi;
        info!("Connecting to WiFi {}", wifi.ssid);
        self.station.associate(&wifi.ssid, &wifi.password);

        self.wifi_retry.reset();
        let mut attempt = 0;
        while !self.station.is_associated() {
            match self.wifi_retry.next_delay(attempt) {
                Some(ms) => self.delay.delay_ms(ms),
                None => return Err(self.give_up()),
            }
            attempt += 1;
        }
        info!("WiFi connected");
        Ok(())
    }

    fn open_session(&mut self) -> Result<(), Error> {
        let config = self.config;
        let broker = &config.broker;
        self.broker_retry.reset();
        let mut attempt = 0;
        loop {
            info!(
                "Connecting to MQTT broker {}:{} as {}",
                broker.host, broker.port, self.client_id
            );
            match self.broker.connect(&self.client_id, &broker.credentials) {
                Ok(()) => {
                    info!("MQTT connected");
                    return Ok(());
                }
                Err(e) => {
                    let Some(ms) = self.broker_retry.next_delay(attempt) else {
                        warn!("MQTT connection failed: {}, giving up", e);
                        return Err(self.give_up());
                    };
                    warn!("MQTT connection failed: {}, retrying in {} ms", e, ms);
                    self.delay.delay_ms(ms);
                }
            }
            attempt += 1;
        }
    }

    fn resubscribe(&mut self) {
        let config = self.config;
        for topic in config.topics.inbound() {
            match self.broker.subscribe(topic) {
                Ok(()) => info!("Subscribed to {}", topic),
                Err(e) => warn!("Subscribe to {} failed: {}", topic, e),
            }
        }
    }

    fn give_up(&mut self) -> Error {
        self.state = ConnectionState::Disconnected;
        Error::RetriesExhausted
    }

    /// Current link state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// MQTT client id used for every session.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The broker session.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Mutable access to the broker session, for publishing and polling.
    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }

    /// The WiFi station.
    pub fn station(&self) -> &S {
        &self.station
    }
}

/// `prefix` followed by `mac` as `AA:BB:CC:DD:EE:FF`.
pub fn client_id(prefix: &str, mac: [u8; 6]) -> String<MAX_CLIENT_ID_LEN> {
    let mut id = String::new();
    // Capacity covers the longest prefix plus a formatted MAC.
    let _ = write!(
        id,
        "{}{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        prefix, mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    id
}
