//! # labnode - connectivity-and-dispatch loop for ESP32 lab nodes
//!
//! A small `no_std` library for classroom IoT boards. The board joins a WiFi
//! access point and an MQTT broker, turns four LEDs on and off from JSON
//! messages, and publishes light-sensor samples and button edges.
//!
//! ## Components
//!
//! - **[`ConnectionSupervisor`](node::supervisor::ConnectionSupervisor)**: keeps
//!   the station associated and the broker session open, re-subscribing after
//!   every reconnect. This is the only step that blocks.
//! - **[`TopicRouter`](node::router::TopicRouter)**: maps inbound topics to
//!   [`Command`](node::router::Command)s and decodes `{"state":"ON"|"OFF"}`.
//! - **[`ActuatorBank`](node::actuator::ActuatorBank)**: drives the LED pins.
//! - **[`TelemetryPublisher`](node::telemetry::TelemetryPublisher)**: periodic
//!   light samples and debounced button edges.
//! - **[`Heartbeat`](node::heartbeat::Heartbeat)** and
//!   **[`ClockDisplay`](display::ClockDisplay)**: optional extras from the
//!   lab sketches.
//!
//! A [`Node`](node::Node) owns the supervisor, router and actuators, and
//! ticks a list of [`Tickable`](node::Tickable) components once per
//! iteration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = Config::lab()?;
//! let supervisor = ConnectionSupervisor::new(&config, station, session, delay);
//! let router = TopicRouter::new(&config)?;
//! let actuators = ActuatorBank::new([red, green, blue, yellow]);
//! let mut telemetry = TelemetryPublisher::new(&config, light_sensor, button);
//!
//! let mut node = Node::new(supervisor, router, actuators);
//! node.add(&mut telemetry)?;
//! loop {
//!     node.run_once(clock.now_ms())?;
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `std`: hosted TCP transport, wall clock, `Config::from_env` and the
//!   `labnode` demo binary
//! - `defmt`: `defmt::Format` impls for the public error and state types

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Peripheral capabilities consumed by the node: pins, analog input, time.
pub mod hal;

/// Transport traits and the MQTT client.
pub mod network;

/// The connectivity-and-dispatch core.
pub mod node;

/// Character display and simulated clock.
pub mod display;

pub use node::config::Config;
pub use node::{Broker, Node, Publish, Tickable};
