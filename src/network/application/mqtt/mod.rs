//! MQTT 3.1.1 support.
//!
//! - [`client`]: the packet-level client ([`Client`]), bound to a single
//!   connection.
//! - [`session`]: [`MqttSession`], which owns a connector and reopens the
//!   transport plus client on every reconnect. It implements
//!   [`Broker`](crate::node::Broker).
//!
//! Topics are matched by exact string equality in this crate; no wildcard
//! subscriptions are used.

/// MQTT client implementation and supporting types.
pub mod client;

/// Reconnectable broker session.
pub mod session;

pub use client::{Client, Options, PublishPacket, QoS};
pub use session::MqttSession;
