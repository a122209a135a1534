//! Node configuration.
//!
//! One [`Config`] is built at startup and borrowed by every component. The
//! defaults are the classroom lab values: the Wokwi simulator access point,
//! the course broker and the `ttpu/iot/maqsud` topic namespace.

use core::fmt::Write as _;

use heapless::String;

use super::Error;
use super::actuator::ActuatorId;

/// Capacity of topic strings.
pub const MAX_TOPIC_LEN: usize = 96;
/// Capacity of host names.
pub const MAX_HOST_LEN: usize = 64;
/// Capacity of usernames and passwords.
pub const MAX_SECRET_LEN: usize = 64;
/// Capacity of the WiFi SSID (802.11 limit).
pub const MAX_SSID_LEN: usize = 32;
/// Capacity of the client id prefix.
pub const MAX_PREFIX_LEN: usize = 32;

/// A topic name.
pub type Topic = String<MAX_TOPIC_LEN>;

/// Default topic namespace.
pub const DEFAULT_TOPIC_PREFIX: &str = "ttpu/iot/maqsud";

/// Broker username and password.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Username, empty for anonymous sessions.
    pub username: String<MAX_SECRET_LEN>,
    /// Password, ignored without a username.
    pub password: String<MAX_SECRET_LEN>,
}

/// Access point the station joins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiCredentials {
    /// Network name.
    pub ssid: String<MAX_SSID_LEN>,
    /// Pre-shared key, empty for open networks.
    pub password: String<MAX_SECRET_LEN>,
}

/// Broker address and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String<MAX_HOST_LEN>,
    /// TCP port, 1883 for plain MQTT.
    pub port: u16,
    /// Credentials sent in CONNECT.
    pub credentials: Credentials,
}

/// Inbound and outbound topic names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// LED control topics, indexed by [`ActuatorId::index`].
    pub led: [Topic; ActuatorId::COUNT],
    /// Light sensor samples.
    pub sensor: Topic,
    /// Button edges.
    pub button: Topic,
    /// Heartbeat counter messages.
    pub heartbeat: Topic,
}

impl Topics {
    /// Build the standard topic set under `prefix`:
    /// `<prefix>/led/<color>`, `<prefix>/sensors/light`,
    /// `<prefix>/events/button` and `<prefix>/out`.
    pub fn with_prefix(prefix: &str) -> Result<Self, Error> {
        let prefix = prefix.trim_end_matches('/');
        let mut led: [Topic; ActuatorId::COUNT] = Default::default();
        for id in ActuatorId::ALL {
            led[id.index()] = join(prefix, "led/", id.name())?;
        }

        Ok(Self {
            led,
            sensor: join(prefix, "sensors/", "light")?,
            button: join(prefix, "events/", "button")?,
            heartbeat: join(prefix, "", "out")?,
        })
    }

    /// The LED topic for `id`.
    pub fn led_topic(&self, id: ActuatorId) -> &str {
        &self.led[id.index()]
    }

    /// Every topic the node subscribes to.
    pub fn inbound(&self) -> impl Iterator<Item = &str> {
        self.led.iter().map(|topic| topic.as_str())
    }
}

fn join(prefix: &str, group: &str, leaf: &str) -> Result<Topic, Error> {
    let mut topic = Topic::new();
    write!(topic, "{}/{}{}", prefix, group, leaf).map_err(|_| Error::Config)?;
    Ok(topic)
}

/// Intervals and retry delays, in milliseconds unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Period between light sensor samples.
    pub sensor_interval_ms: u64,
    /// Minimum time between accepted button transitions.
    pub debounce_ms: u64,
    /// Period between heartbeat messages.
    pub heartbeat_interval_ms: u64,
    /// Delay between WiFi association polls.
    pub wifi_retry_ms: u32,
    /// Delay after a failed broker connection attempt.
    pub broker_retry_ms: u32,
    /// MQTT keep-alive, in seconds.
    pub keep_alive_seconds: u16,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sensor_interval_ms: 5_000,
            debounce_ms: 100,
            heartbeat_interval_ms: 5_000,
            wifi_retry_ms: 500,
            broker_retry_ms: 5_000,
            keep_alive_seconds: 60,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Access point.
    pub wifi: WifiCredentials,
    /// Broker endpoint.
    pub broker: Endpoint,
    /// Prepended to the station MAC to form the MQTT client id.
    pub client_id_prefix: String<MAX_PREFIX_LEN>,
    /// Topic names.
    pub topics: Topics,
    /// Intervals and delays.
    pub timing: Timing,
}

impl Config {
    /// Lab defaults under [`DEFAULT_TOPIC_PREFIX`].
    pub fn lab() -> Result<Self, Error> {
        Self::with_prefix(DEFAULT_TOPIC_PREFIX)
    }

    /// Lab defaults with every topic under `prefix`.
    pub fn with_prefix(prefix: &str) -> Result<Self, Error> {
        Ok(Self {
            wifi: WifiCredentials {
                ssid: text("Wokwi-GUEST")?,
                password: String::new(),
            },
            broker: Endpoint {
                host: text("mqtt.iotserver.uz")?,
                port: 1883,
                credentials: Credentials {
                    username: text("userTTPU")?,
                    password: text("mqttpass")?,
                },
            },
            client_id_prefix: text("esp32-client-")?,
            topics: Topics::with_prefix(prefix)?,
            timing: Timing::default(),
        })
    }

    /// Lab defaults, overridden by `LABNODE_*` environment variables.
    ///
    /// Recognised variables: `LABNODE_WIFI_SSID`, `LABNODE_WIFI_PASSWORD`,
    /// `LABNODE_BROKER_HOST`, `LABNODE_BROKER_PORT`, `LABNODE_MQTT_USERNAME`,
    /// `LABNODE_MQTT_PASSWORD`, `LABNODE_CLIENT_ID_PREFIX`,
    /// `LABNODE_TOPIC_PREFIX`.
    #[cfg(feature = "std")]
    pub fn from_env() -> Result<Self, Error> {
        use std::env::var;

        let prefix = var("LABNODE_TOPIC_PREFIX").unwrap_or_else(|_| DEFAULT_TOPIC_PREFIX.into());
        let mut config = Self::with_prefix(&prefix)?;

        if let Ok(value) = var("LABNODE_WIFI_SSID") {
            config.wifi.ssid = text(&value)?;
        }
        if let Ok(value) = var("LABNODE_WIFI_PASSWORD") {
            config.wifi.password = text(&value)?;
        }
        if let Ok(value) = var("LABNODE_BROKER_HOST") {
            config.broker.host = text(&value)?;
        }
        if let Ok(value) = var("LABNODE_BROKER_PORT") {
            config.broker.port = value.parse().map_err(|_| Error::Config)?;
        }
        if let Ok(value) = var("LABNODE_MQTT_USERNAME") {
            config.broker.credentials.username = text(&value)?;
        }
        if let Ok(value) = var("LABNODE_MQTT_PASSWORD") {
            config.broker.credentials.password = text(&value)?;
        }
        if let Ok(value) = var("LABNODE_CLIENT_ID_PREFIX") {
            config.client_id_prefix = text(&value)?;
        }
        Ok(config)
    }
}

/// Copy `value` into a fixed-capacity string.
pub fn text<const N: usize>(value: &str) -> Result<String<N>, Error> {
    String::try_from(value).map_err(|_| Error::Config)
}
