//! The connectivity-and-dispatch core.
//!
//! A [`Node`] runs one cooperative loop iteration per call to
//! [`run_once`](Node::run_once):
//!
//! 1. the [`ConnectionSupervisor`](supervisor::ConnectionSupervisor) makes
//!    sure the station is associated and the broker session is open;
//! 2. while connected, up to [`MAX_DRAIN_PER_TICK`] inbound messages are
//!    routed through the [`TopicRouter`](router::TopicRouter) and applied to
//!    the [`ActuatorBank`](actuator::ActuatorBank);
//! 3. every registered [`Tickable`] runs once.

use heapless::Vec;
use log::{debug, warn};

use crate::hal::{Clock, Delay, OutputPin};
use crate::network::Station;
use crate::network::application::mqtt::PublishPacket;
use crate::network::error::Error as NetworkError;

pub mod actuator;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod interval;
pub mod retry;
pub mod router;
pub mod supervisor;
pub mod telemetry;

pub use error::Error;

use actuator::ActuatorBank;
use retry::{FixedDelay, RetryPolicy};
use router::TopicRouter;
use supervisor::{ConnectionState, ConnectionSupervisor};

/// Maximum number of components a [`Node`] ticks.
pub const MAX_COMPONENTS: usize = 8;

/// Maximum inbound messages handled per iteration.
pub const MAX_DRAIN_PER_TICK: usize = 16;

/// Sends a message to the broker.
pub trait Publish {
    /// Publish `payload` on `topic` at most once.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), NetworkError>;
}

/// A broker session the supervisor can (re)open.
pub trait Broker: Publish {
    /// Open a session identified as `client_id`.
    fn connect(
        &mut self,
        client_id: &str,
        credentials: &config::Credentials,
    ) -> Result<(), NetworkError>;

    /// Whether the session is currently open.
    fn is_connected(&self) -> bool;

    /// Subscribe to `topic` on the open session.
    fn subscribe(&mut self, topic: &str) -> Result<(), NetworkError>;

    /// Next inbound message, or `None` if nothing is pending.
    fn poll(&mut self) -> Result<Option<PublishPacket>, NetworkError>;
}

/// A component that does periodic, non-blocking work.
pub trait Tickable {
    /// Run once at `now_ms`, publishing through `out` if needed.
    fn tick(&mut self, now_ms: u64, out: &mut dyn Publish);
}

/// The main loop.
pub struct Node<'a, 'c, S, B, D, P, R = FixedDelay>
where
    S: Station,
    B: Broker,
    D: Delay,
    P: OutputPin,
    R: RetryPolicy,
{
    supervisor: ConnectionSupervisor<'c, S, B, D, R>,
    router: TopicRouter,
    actuators: ActuatorBank<P>,
    components: Vec<&'a mut dyn Tickable, MAX_COMPONENTS>,
}

impl<S, B, D, P, R> core::fmt::Debug for Node<'_, '_, S, B, D, P, R>
where
    S: Station,
    B: Broker,
    D: Delay,
    P: OutputPin,
    R: RetryPolicy,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("state", &self.supervisor.state())
            .field("components", &self.components.len())
            .finish()
    }
}

impl<'a, 'c, S, B, D, P, R> Node<'a, 'c, S, B, D, P, R>
where
    S: Station,
    B: Broker,
    D: Delay,
    P: OutputPin,
    R: RetryPolicy,
{
    /// Assemble a node with no components.
    pub fn new(
        supervisor: ConnectionSupervisor<'c, S, B, D, R>,
        router: TopicRouter,
        actuators: ActuatorBank<P>,
    ) -> Self {
        Self {
            supervisor,
            router,
            actuators,
            components: Vec::new(),
        }
    }

    /// Register a component. Components tick in registration order.
    pub fn add(&mut self, component: &'a mut dyn Tickable) -> Result<(), Error> {
        self.components
            .push(component)
            .map_err(|_| Error::TooManyComponents)
    }

    /// Run one loop iteration at `now_ms`.
    ///
    /// Components tick even when the link could not be brought up; their
    /// publishes fail and are logged. The link error, if any, is returned
    /// afterwards.
    pub fn run_once(&mut self, now_ms: u64) -> Result<(), Error> {
        let link = self.supervisor.ensure_connected();
        if let Err(e) = link {
            warn!("Link not available: {}", e);
        }

        if self.supervisor.state() == ConnectionState::Connected {
            self.drain();
        }

        let broker = self.supervisor.broker_mut();
        for component in self.components.iter_mut() {
            component.tick(now_ms, &mut *broker);
        }

        link
    }

    /// Run forever, reading time from `clock`.
    pub fn run<C: Clock>(&mut self, clock: &C) -> ! {
        loop {
            // Errors are logged by run_once; the next iteration retries.
            let _ = self.run_once(clock.now_ms());
        }
    }

    fn drain(&mut self) {
        for _ in 0..MAX_DRAIN_PER_TICK {
            match self.supervisor.broker_mut().poll() {
                Ok(Some(packet)) => {
                    if let Some(command) = self.router.route(&packet.topic, &packet.payload) {
                        self.actuators.apply(command);
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    warn!("Inbound poll failed: {}", e);
                    return;
                }
            }
        }
        debug!("Drain limit reached, deferring remaining messages");
    }

    /// The connection supervisor.
    pub fn supervisor(&self) -> &ConnectionSupervisor<'c, S, B, D, R> {
        &self.supervisor
    }

    /// Mutable access to the connection supervisor.
    pub fn supervisor_mut(&mut self) -> &mut ConnectionSupervisor<'c, S, B, D, R> {
        &mut self.supervisor
    }

    /// The topic router.
    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    /// The LED outputs.
    pub fn actuators(&self) -> &ActuatorBank<P> {
        &self.actuators
    }
}
