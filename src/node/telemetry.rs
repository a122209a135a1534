//! Light sensor samples and button edges.

use log::{debug, warn};
use serde::Serialize;

use super::config::Config;
use super::interval::Interval;
use super::{Error, Publish, Tickable};
use crate::hal::{AnalogInput, InputPin};

/// Buffer size for one encoded telemetry event.
pub const MAX_EVENT_LEN: usize = 64;

/// Debounced button level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// Input reads high.
    Pressed,
    /// Input reads low.
    Released,
}

impl ButtonState {
    /// The wire name, `"pressed"` or `"released"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            ButtonState::Pressed => "pressed",
            ButtonState::Released => "released",
        }
    }
}

impl From<bool> for ButtonState {
    fn from(high: bool) -> Self {
        if high {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

/// One observation, encoded and published as soon as it is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// Raw analog light reading.
    SensorSample {
        /// ADC value.
        value: u16,
        /// Milliseconds since boot.
        timestamp: u64,
    },
    /// Accepted button transition.
    ButtonEdge {
        /// New level.
        state: ButtonState,
        /// Milliseconds since boot.
        timestamp: u64,
    },
}

#[derive(Serialize)]
struct LightSample {
    light: u16,
    timestamp: u64,
}

#[derive(Serialize)]
struct ButtonEvent {
    event: &'static str,
    timestamp: u64,
}

impl TelemetryEvent {
    /// Write the JSON form of the event into `buf`, returning its length.
    ///
    /// Sensor samples encode as `{"light":v,"timestamp":t}`, button edges as
    /// `{"event":"pressed","timestamp":t}`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let written = match *self {
            TelemetryEvent::SensorSample { value, timestamp } => serde_json_core::to_slice(
                &LightSample {
                    light: value,
                    timestamp,
                },
                buf,
            ),
            TelemetryEvent::ButtonEdge { state, timestamp } => serde_json_core::to_slice(
                &ButtonEvent {
                    event: state.as_str(),
                    timestamp,
                },
                buf,
            ),
        };
        written.map_err(|_| Error::Encode)
    }
}

/// Accepts a level change only after a quiet window.
///
/// A new level is accepted when it differs from the last accepted level and
/// at least `window_ms` has passed since the last accepted change. The first
/// change is accepted immediately. A press and release that both land inside
/// one window are lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    window_ms: u64,
    accepted: bool,
    last_change: Option<u64>,
}

impl Debouncer {
    /// A debouncer that starts at the low (released) level.
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            accepted: false,
            last_change: None,
        }
    }

    /// Feed a raw reading; returns the new level if a change is accepted.
    pub fn update(&mut self, level: bool, now_ms: u64) -> Option<bool> {
        if level == self.accepted {
            return None;
        }
        if let Some(last) = self.last_change {
            let settled = now_ms
                .checked_sub(last)
                .is_some_and(|elapsed| elapsed >= self.window_ms);
            if !settled {
                return None;
            }
        }
        self.accepted = level;
        self.last_change = Some(now_ms);
        Some(level)
    }

    /// Last accepted level.
    pub fn level(&self) -> bool {
        self.accepted
    }
}

/// Publishes light samples on a fixed interval and debounced button edges.
#[derive(Debug)]
pub struct TelemetryPublisher<'c, A: AnalogInput, I: InputPin> {
    config: &'c Config,
    sensor: A,
    button: I,
    sample: Interval,
    debouncer: Debouncer,
}

impl<'c, A: AnalogInput, I: InputPin> TelemetryPublisher<'c, A, I> {
    /// Sample `sensor` every `sensor_interval_ms`, starting on the first
    /// tick, and watch `button` with the configured debounce window.
    pub fn new(config: &'c Config, sensor: A, button: I) -> Self {
        Self {
            config,
            sensor,
            button,
            sample: Interval::new(config.timing.sensor_interval_ms),
            debouncer: Debouncer::new(config.timing.debounce_ms),
        }
    }

    /// Last accepted button level.
    pub fn button_state(&self) -> ButtonState {
        self.debouncer.level().into()
    }

    fn emit(&self, topic: &str, event: TelemetryEvent, out: &mut dyn Publish) {
        let mut buf = [0u8; MAX_EVENT_LEN];
        let len = match event.encode(&mut buf) {
            Ok(len) => len,
            Err(e) => {
                warn!("Dropping {:?}: {}", event, e);
                return;
            }
        };
        match out.publish(topic, &buf[..len]) {
            Ok(()) => debug!("Published {:?} to {}", event, topic),
            Err(e) => warn!("Publish to {} failed: {}", topic, e),
        }
    }
}

impl<A: AnalogInput, I: InputPin> Tickable for TelemetryPublisher<'_, A, I> {
    fn tick(&mut self, now_ms: u64, out: &mut dyn Publish) {
        let config = self.config;
        let topics = &config.topics;

        if self.sample.poll(now_ms) {
            let event = TelemetryEvent::SensorSample {
                value: self.sensor.read(),
                timestamp: now_ms,
            };
            self.emit(&topics.sensor, event, out);
        }

        let level = self.button.is_high();
        if let Some(level) = self.debouncer.update(level, now_ms) {
            let event = TelemetryEvent::ButtonEdge {
                state: level.into(),
                timestamp: now_ms,
            };
            self.emit(&topics.button, event, out);
        }
    }
}
