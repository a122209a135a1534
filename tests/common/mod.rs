#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use labnode::display::{CharacterDisplay, DisplayError};
use labnode::hal::{AnalogInput, Delay, InputPin, OutputPin};
use labnode::network::application::mqtt::PublishPacket;
use labnode::network::error::Error;
use labnode::network::{Close, Connect, Connection, Read, Station, Write};
use labnode::node::config::Credentials;
use labnode::{Broker, Publish};

pub const MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56];

pub fn packet(topic: &str, payload: &[u8]) -> PublishPacket {
    PublishPacket {
        topic: heapless::String::try_from(topic).unwrap(),
        payload: heapless::Vec::from_slice(payload).unwrap(),
    }
}

/// WiFi station that joins after a configurable number of polls.
#[derive(Debug, Default)]
pub struct MockStation {
    pub associated: bool,
    pub joining: bool,
    pub polls_left: usize,
    pub joins: Vec<(String, String)>,
}

impl MockStation {
    pub fn associated() -> Self {
        Self {
            associated: true,
            ..Self::default()
        }
    }

    pub fn joins_after(polls: usize) -> Self {
        Self {
            polls_left: polls,
            ..Self::default()
        }
    }
}

impl Station for MockStation {
    fn is_associated(&mut self) -> bool {
        if !self.associated && self.joining {
            if self.polls_left == 0 {
                self.associated = true;
            } else {
                self.polls_left -= 1;
            }
        }
        self.associated
    }

    fn associate(&mut self, ssid: &str, password: &str) {
        self.joins.push((ssid.to_string(), password.to_string()));
        self.joining = true;
    }

    fn mac_address(&self) -> [u8; 6] {
        MAC
    }
}

/// Everything the broker saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Connect(String),
    Subscribe(String),
    Deliver(String),
    Publish(String),
}

/// In-memory broker session.
#[derive(Debug, Default)]
pub struct MockBroker {
    pub connected: bool,
    pub failures_left: usize,
    pub connect_attempts: usize,
    pub credentials: Option<Credentials>,
    pub refuse_subscribe: bool,
    pub fail_publish: bool,
    pub inbox: VecDeque<PublishPacket>,
    pub published: Vec<(String, Vec<u8>)>,
    pub events: Vec<BrokerEvent>,
}

impl MockBroker {
    pub fn failing(times: usize) -> Self {
        Self {
            failures_left: times,
            ..Self::default()
        }
    }

    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back(packet(topic, payload));
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BrokerEvent::Subscribe(topic) => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| String::from_utf8(payload.clone()).unwrap())
            .collect()
    }
}

impl Publish for MockBroker {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.fail_publish {
            return Err(Error::WriteError);
        }
        self.events.push(BrokerEvent::Publish(topic.to_string()));
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

impl Broker for MockBroker {
    fn connect(&mut self, client_id: &str, credentials: &Credentials) -> Result<(), Error> {
        self.connect_attempts += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(Error::ConnectionRefused);
        }
        self.connected = true;
        self.credentials = Some(credentials.clone());
        self.events.push(BrokerEvent::Connect(client_id.to_string()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.refuse_subscribe {
            return Err(Error::ConnectionRefused);
        }
        self.events.push(BrokerEvent::Subscribe(topic.to_string()));
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<PublishPacket>, Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let packet = self.inbox.pop_front();
        if let Some(packet) = &packet {
            self.events
                .push(BrokerEvent::Deliver(packet.topic.as_str().to_string()));
        }
        Ok(packet)
    }
}

/// Collects publishes from components ticked outside a node.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub fail: bool,
    pub messages: Vec<(String, String)>,
}

impl Publish for RecordingPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Error> {
        if self.fail {
            return Err(Error::NotConnected);
        }
        self.messages.push((
            topic.to_string(),
            String::from_utf8(payload.to_vec()).unwrap(),
        ));
        Ok(())
    }
}

/// Output pin that remembers its level and how often it was written.
#[derive(Debug, Default)]
pub struct RecordingPin {
    pub high: bool,
    pub writes: usize,
}

impl OutputPin for RecordingPin {
    fn set_level(&mut self, high: bool) {
        self.high = high;
        self.writes += 1;
    }
}

pub fn pins() -> [RecordingPin; 4] {
    Default::default()
}

/// Digital input the test can flip while a component owns a clone.
#[derive(Debug, Clone, Default)]
pub struct SharedInput(Rc<Cell<bool>>);

impl SharedInput {
    pub fn set(&self, high: bool) {
        self.0.set(high);
    }
}

impl InputPin for SharedInput {
    fn is_high(&mut self) -> bool {
        self.0.get()
    }
}

/// Analog input the test can change while a component owns a clone.
#[derive(Debug, Clone, Default)]
pub struct SharedAnalog(Rc<Cell<u16>>);

impl SharedAnalog {
    pub fn set(&self, value: u16) {
        self.0.set(value);
    }
}

impl AnalogInput for SharedAnalog {
    fn read(&mut self) -> u16 {
        self.0.get()
    }
}

/// Delay that records requested sleeps instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct MockDelay(Rc<RefCell<Vec<u32>>>);

impl MockDelay {
    pub fn sleeps(&self) -> Vec<u32> {
        self.0.borrow().clone()
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(ms);
    }
}

/// Character display that keeps a 16x2 frame buffer.
#[derive(Debug, Clone, Default)]
pub struct MockDisplay {
    pub fail_with: Option<u8>,
    pub size: Option<(u8, u8)>,
    pub rows: [String; 2],
    pub row: usize,
    pub clears: usize,
}

impl CharacterDisplay for MockDisplay {
    fn begin(&mut self, cols: u8, rows: u8) -> Result<(), DisplayError> {
        if let Some(code) = self.fail_with {
            return Err(DisplayError::Init(code));
        }
        self.size = Some((cols, rows));
        Ok(())
    }

    fn clear(&mut self) {
        self.rows = Default::default();
        self.row = 0;
        self.clears += 1;
    }

    fn set_cursor(&mut self, _col: u8, row: u8) {
        self.row = usize::from(row);
    }

    fn print(&mut self, text: &str) {
        self.rows[self.row].push_str(text);
    }
}

/// Both ends of a scripted byte stream.
#[derive(Debug, Default)]
pub struct Wire {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub broken: bool,
    pub closed: bool,
}

/// Connection whose peer is scripted through a shared [`Wire`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnection {
    pub wire: Rc<RefCell<Wire>>,
}

impl ScriptedConnection {
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let connection = Self::default();
        connection.push_inbound(bytes);
        connection
    }

    pub fn push_inbound(&self, bytes: &[u8]) {
        self.wire.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    pub fn take_outbound(&self) -> Vec<u8> {
        std::mem::take(&mut self.wire.borrow_mut().outbound)
    }

    pub fn break_link(&self) {
        self.wire.borrow_mut().broken = true;
    }
}

impl Read for ScriptedConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.broken {
            return Err(Error::ReadError);
        }
        let len = buf.len().min(wire.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(wire.inbound.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }

    fn ready(&mut self) -> Result<bool, Self::Error> {
        let wire = self.wire.borrow();
        if wire.broken {
            return Err(Error::ReadError);
        }
        Ok(!wire.inbound.is_empty())
    }
}

impl Write for ScriptedConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.broken {
            return Err(Error::WriteError);
        }
        wire.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for ScriptedConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closed = true;
        Ok(())
    }
}

impl Connection for ScriptedConnection {}

/// Connector that hands out scripted connections in order.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    pub connections: VecDeque<ScriptedConnection>,
    pub remotes: Vec<String>,
    /// Error returned once the scripted connections run out.
    pub exhausted: Option<Error>,
}

impl Connect for ScriptedNetwork {
    type Connection = ScriptedConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        self.remotes.push(remote.to_string());
        self.connections
            .pop_front()
            .ok_or(self.exhausted.unwrap_or(Error::ConnectionRefused))
    }
}

pub const CONNACK_OK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

pub fn suback(packet_id: u16) -> [u8; 5] {
    let id = packet_id.to_be_bytes();
    [0x90, 0x03, id[0], id[1], 0x00]
}

/// Encode an inbound PUBLISH at QoS 0 (no packet id) or 1.
pub fn publish_frame(topic: &str, payload: &[u8], packet_id: Option<u16>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    body.extend_from_slice(topic.as_bytes());
    if let Some(id) = packet_id {
        body.extend_from_slice(&id.to_be_bytes());
    }
    body.extend_from_slice(payload);

    let header = if packet_id.is_some() { 0x32 } else { 0x30 };
    let mut frame = vec![header];
    let mut len = body.len();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        frame.push(byte);
        if len == 0 {
            break;
        }
    }
    frame.extend_from_slice(&body);
    frame
}
