//! Periodic "hello" counter on the outbound topic.

use core::fmt::Write as _;

use heapless::String;
use log::{info, warn};

use super::config::Config;
use super::interval::Interval;
use super::{Publish, Tickable};

/// Publishes `Hello from ESP32! Count: N` every `heartbeat_interval_ms`.
///
/// The counter advances on every firing, whether or not the publish
/// succeeds.
#[derive(Debug)]
pub struct Heartbeat<'c> {
    config: &'c Config,
    interval: Interval,
    count: u32,
}

impl<'c> Heartbeat<'c> {
    /// Heartbeat due on the first tick.
    pub fn new(config: &'c Config) -> Self {
        Self {
            config,
            interval: Interval::new(config.timing.heartbeat_interval_ms),
            count: 0,
        }
    }

    /// Messages attempted so far.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Tickable for Heartbeat<'_> {
    fn tick(&mut self, now_ms: u64, out: &mut dyn Publish) {
        if !self.interval.poll(now_ms) {
            return;
        }
        self.count = self.count.wrapping_add(1);

        let mut message: String<48> = String::new();
        // "Hello from ESP32! Count: " plus at most ten digits.
        let _ = write!(message, "Hello from ESP32! Count: {}", self.count);

        let topic = &self.config.topics.heartbeat;
        match out.publish(topic, message.as_bytes()) {
            Ok(()) => info!("Published {:?} to {}", message.as_str(), topic),
            Err(e) => warn!("Publish to {} failed: {}", topic, e),
        }
    }
}
