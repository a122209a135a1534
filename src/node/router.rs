//! Inbound topic routing and the LED payload codec.
//!
//! Only exact topic matches are routed. A matching message must carry a JSON
//! object whose `state` field is the string `"ON"` or `"OFF"`; anything else
//! is logged and dropped.

use heapless::FnvIndexMap;
use log::{debug, warn};
use serde::Deserialize;

use super::Error;
use super::actuator::ActuatorId;
use super::config::{Config, Topic};

/// Table capacity; must be a power of two and at least [`ActuatorId::COUNT`].
const TABLE_CAPACITY: usize = 8;

/// A decoded instruction for the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch one output on or off.
    SetActuator {
        /// Target output.
        id: ActuatorId,
        /// Requested level.
        on: bool,
    },
}

/// Why an LED payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a JSON object, or `state` is not a string.
    Json,
    /// No `state` field, or it is `null`.
    MissingState,
    /// `state` is a string other than `"ON"` or `"OFF"`.
    UnknownState,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DecodeError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            DecodeError::Json => defmt::write!(f, "Json"),
            DecodeError::MissingState => defmt::write!(f, "MissingState"),
            DecodeError::UnknownState => defmt::write!(f, "UnknownState"),
        }
    }
}

#[derive(Deserialize)]
struct LedPayload<'a> {
    #[serde(borrow)]
    state: Option<&'a str>,
}

/// Decode an LED payload into the requested level.
pub fn decode_state(payload: &[u8]) -> Result<bool, DecodeError> {
    let (parsed, _): (LedPayload, _) =
        serde_json_core::from_slice(payload).map_err(|_| DecodeError::Json)?;

    match parsed.state {
        Some("ON") => Ok(true),
        Some("OFF") => Ok(false),
        Some(_) => Err(DecodeError::UnknownState),
        None => Err(DecodeError::MissingState),
    }
}

/// Maps LED topics to actuators.
#[derive(Debug)]
pub struct TopicRouter {
    table: FnvIndexMap<Topic, ActuatorId, TABLE_CAPACITY>,
}

impl TopicRouter {
    /// Build the routing table from the configured LED topics.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut table = FnvIndexMap::new();
        for id in ActuatorId::ALL {
            let topic = config.topics.led[id.index()].clone();
            table.insert(topic, id).map_err(|_| Error::Config)?;
        }
        Ok(Self { table })
    }

    /// The actuator bound to `topic`, if any.
    pub fn actuator_for(&self, topic: &str) -> Option<ActuatorId> {
        let key = Topic::try_from(topic).ok()?;
        self.table.get(&key).copied()
    }

    /// Topics present in the table.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(|topic| topic.as_str())
    }

    /// Turn an inbound message into a [`Command`].
    ///
    /// Returns `None` for unknown topics and for payloads that fail to
    /// decode; neither is an error for the caller.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Option<Command> {
        let text = core::str::from_utf8(payload).unwrap_or("<binary>");

        let Some(id) = self.actuator_for(topic) else {
            debug!("Ignoring message on {}: {}", topic, text);
            return None;
        };

        match decode_state(payload) {
            Ok(on) => Some(Command::SetActuator { id, on }),
            Err(e) => {
                warn!("Dropping payload on {} ({:?}): {}", topic, e, text);
                None
            }
        }
    }
}
