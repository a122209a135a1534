//! # Application layer protocols
//!
//! Protocol clients built on the transport traits in [`crate::network`].
//! They are connection agnostic and use fixed-size buffers only.

/// MQTT 3.1.1 client and the broker session used by the node.
///
/// Provides the publish-subscribe transport behind
/// [`Broker`](crate::node::Broker).
pub mod mqtt;
