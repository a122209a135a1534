//! MQTT 3.1.1 client for the lab node.
//!
//! A small blocking client over any [`Connection`]: CONNECT with optional
//! username/password, PUBLISH at QoS 0 or 1, SUBSCRIBE, PINGREQ, DISCONNECT,
//! and a non-blocking [`poll`](Client::poll) that hands back inbound PUBLISH
//! packets and quietly consumes everything else (SUBACK, PUBACK, PINGRESP).
//!
//! A broker may deliver messages before it acknowledges a SUBSCRIBE, most
//! often the retained message of a topic subscribed just before.
//! [`subscribe`](Client::subscribe) holds such messages back and `poll`
//! returns them first, in arrival order.
//!
//! Buffers are fixed-size `heapless` containers, so the client works in
//! `no_std` firmware.
//!
//! ```rust,no_run
//! use labnode::network::application::mqtt::{Client, Options, QoS};
//! # use labnode::network::Connection;
//! # struct TcpConnection;
//! # impl Connection for TcpConnection {}
//! # impl labnode::network::Read for TcpConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl labnode::network::Write for TcpConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl labnode::network::Close for TcpConnection {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! let options = Options {
//!     client_id: "esp32-client-24:0A:C4:00:01:10",
//!     username: Some("userTTPU"),
//!     password: Some("mqttpass"),
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//! };
//!
//! // let mut client = Client::connect(TcpConnection, options)?;
//! // client.subscribe("ttpu/iot/maqsud/led/red", QoS::AtMostOnce)?;
//! // client.publish("ttpu/iot/maqsud/sensors/light", br#"{"light":812}"#, QoS::AtMostOnce)?;
//! ```

use crate::network::error::Error;
use crate::network::{Connection, Read, Write};
use heapless::{Deque, String, Vec};
use log::warn;

// MQTT control packet types (fixed header, first byte)
const CONNECT: u8 = 0x10;
const CONNACK: u8 = 0x20;
const PUBLISH: u8 = 0x30;
const PUBACK: u8 = 0x40;
const SUBSCRIBE: u8 = 0x82;
const SUBACK: u8 = 0x90;
const PINGREQ: u8 = 0xC0;
const DISCONNECT: u8 = 0xE0;

const PROTOCOL_NAME: &[u8] = b"MQTT";
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

const FLAG_USERNAME: u8 = 0x80;
const FLAG_PASSWORD: u8 = 0x40;
const FLAG_CLEAN_SESSION: u8 = 0x02;

/// Largest packet body the client will build or accept.
pub const MAX_PACKET_LEN: usize = 1024;
/// Largest topic name accepted on inbound messages.
pub const MAX_TOPIC_LEN: usize = 256;
/// Inbound messages held back while waiting for a SUBACK, one per LED topic.
pub const MAX_PENDING: usize = 4;

/// An inbound PUBLISH message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic the message was published on.
    pub topic: String<MAX_TOPIC_LEN>,
    /// The raw message payload.
    pub payload: Vec<u8, MAX_PACKET_LEN>,
}

/// Quality of Service levels for MQTT messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce = 0,
    /// Acknowledged delivery; duplicates possible.
    AtLeastOnce = 1,
    /// Assured single delivery.
    ExactlyOnce = 2,
}

/// Connection options sent in the CONNECT packet.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// Client identifier; the broker drops an older session with the same id.
    pub client_id: &'a str,
    /// Optional username.
    pub username: Option<&'a str>,
    /// Optional password. Only sent together with a username.
    pub password: Option<&'a str>,
    /// Keep-alive interval in seconds, 0 disables it.
    pub keep_alive_seconds: u16,
    /// Start from a clean session. Subscriptions do not survive a reconnect
    /// when this is set.
    pub clean_session: bool,
}

/// One complete inbound packet.
enum Inbound {
    Publish(PublishPacket),
    SubAck { packet_id: u16, code: u8 },
    Other,
}

/// An MQTT 3.1.1 client bound to one connection.
pub struct Client<C: Connection> {
    connection: C,
    is_connected: bool,
    next_packet_id: u16,
    pending: Deque<PublishPacket, MAX_PENDING>,
}

impl<C: Connection> core::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("is_connected", &self.is_connected)
            .field("next_packet_id", &self.next_packet_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<C: Connection> Client<C> {
    /// Perform the CONNECT/CONNACK handshake over `connection`.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] / [`Error::ReadError`] - transport failure
    /// * [`Error::ConnectionClosed`] - the peer closed during the handshake
    /// * [`Error::ConnectionRefused`] - CONNACK return code 1..=5 (bad
    ///   protocol, rejected id, unavailable, bad credentials, not authorised)
    /// * [`Error::ProtocolError`] - malformed CONNACK
    /// * [`Error::BufferOverflow`] - client id or credentials too long
    pub fn connect(mut connection: C, options: Options) -> Result<Self, Error> {
        let mut body: Vec<u8, MAX_PACKET_LEN> = Vec::new();

        // Variable header
        put_bytes(&mut body, PROTOCOL_NAME)?;
        put_u8(&mut body, PROTOCOL_LEVEL)?;

        let mut flags = 0;
        if options.clean_session {
            flags |= FLAG_CLEAN_SESSION;
        }
        let password = match options.username {
            Some(_) => options.password,
            None => None,
        };
        if options.username.is_some() {
            flags |= FLAG_USERNAME;
        }
        if password.is_some() {
            flags |= FLAG_PASSWORD;
        }
        put_u8(&mut body, flags)?;
        put_u16(&mut body, options.keep_alive_seconds)?;

        // Payload: client id, then username and password in that order
        put_bytes(&mut body, options.client_id.as_bytes())?;
        if let Some(username) = options.username {
            put_bytes(&mut body, username.as_bytes())?;
        }
        if let Some(password) = password {
            put_bytes(&mut body, password.as_bytes())?;
        }

        write_packet(&mut connection, CONNECT, &body)?;

        let mut connack = [0u8; 4];
        read_exact(&mut connection, &mut connack)?;

        if connack[0] != CONNACK || connack[1] != 2 {
            return Err(Error::ProtocolError);
        }

        match connack[3] {
            0 => Ok(Self {
                connection,
                is_connected: true,
                next_packet_id: 1,
                pending: Deque::new(),
            }),
            1..=5 => Err(Error::ConnectionRefused),
            _ => Err(Error::ProtocolError),
        }
    }

    /// Whether the session is still believed to be open.
    ///
    /// Any transport failure or framing error flips this to `false`; the
    /// client is not usable afterwards and must be replaced by a fresh
    /// [`connect`](Client::connect).
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Publish `payload` on `topic`.
    ///
    /// QoS 1 and 2 messages carry a packet identifier; their acknowledgements
    /// are consumed by [`poll`](Client::poll) and not awaited here.
    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        self.ensure_open()?;

        let mut body: Vec<u8, MAX_PACKET_LEN> = Vec::new();
        put_bytes(&mut body, topic.as_bytes())?;
        if qos != QoS::AtMostOnce {
            let packet_id = self.take_packet_id();
            put_u16(&mut body, packet_id)?;
        }
        body.extend_from_slice(payload)
            .map_err(|_| Error::BufferOverflow)?;

        let header = PUBLISH | ((qos as u8) << 1);
        let result = write_packet(&mut self.connection, header, &body);
        self.track(result)
    }

    /// Subscribe to `topic` and wait for the matching SUBACK.
    ///
    /// Messages that arrive first are kept for [`poll`](Client::poll). A
    /// SUBACK for another packet id or a malformed packet closes the session.
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Error> {
        self.ensure_open()?;

        let packet_id = self.take_packet_id();
        let mut body: Vec<u8, MAX_PACKET_LEN> = Vec::new();
        put_u16(&mut body, packet_id)?;
        put_bytes(&mut body, topic.as_bytes())?;
        put_u8(&mut body, qos as u8)?;

        let result = write_packet(&mut self.connection, SUBSCRIBE, &body);
        self.track(result)?;

        loop {
            let result = self.read_inbound();
            match self.track(result) {
                Ok(Inbound::SubAck { packet_id: id, code }) if id == packet_id => {
                    return match code {
                        0x80 => Err(Error::ConnectionRefused),
                        _ => Ok(()),
                    };
                }
                Ok(Inbound::SubAck { .. }) => return self.track(Err(Error::ProtocolError)),
                Ok(Inbound::Publish(packet)) => self.hold(packet),
                Ok(Inbound::Other) => {}
                // Oversized message, already skipped.
                Err(Error::BufferOverflow) => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a PINGREQ. The PINGRESP is consumed by [`poll`](Client::poll).
    pub fn ping(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        let result = write_packet(&mut self.connection, PINGREQ, &[]);
        self.track(result)
    }

    /// Check the connection for one inbound packet.
    ///
    /// Messages held back by [`subscribe`](Client::subscribe) come first.
    /// Returns `Ok(None)` when nothing is waiting or when the packet was not a
    /// PUBLISH. A QoS 1 PUBLISH is acknowledged before it is returned.
    pub fn poll(&mut self) -> Result<Option<PublishPacket>, Error> {
        self.ensure_open()?;
        if let Some(packet) = self.pending.pop_front() {
            return Ok(Some(packet));
        }
        let result = self.read_packet();
        self.track(result)
    }

    /// Send DISCONNECT and close the transport.
    pub fn disconnect(mut self) -> Result<(), Error> {
        if self.is_connected {
            write_packet(&mut self.connection, DISCONNECT, &[])?;
        }
        self.connection.close().map_err(|_| Error::ConnectionClosed)
    }

    fn read_packet(&mut self) -> Result<Option<PublishPacket>, Error> {
        match self.connection.ready() {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(_) => return Err(Error::ReadError),
        }

        match self.read_inbound()? {
            Inbound::Publish(packet) => Ok(Some(packet)),
            Inbound::SubAck { .. } | Inbound::Other => Ok(None),
        }
    }

    /// Read one whole packet, blocking until it is complete.
    fn read_inbound(&mut self) -> Result<Inbound, Error> {
        let mut header = [0u8; 1];
        read_exact(&mut self.connection, &mut header)?;
        let remaining_len = decode_remaining_length(&mut self.connection)?;

        match header[0] & 0xF0 {
            PUBLISH => self.read_publish(header[0], remaining_len).map(Inbound::Publish),
            SUBACK => {
                if remaining_len != 3 {
                    discard(&mut self.connection, remaining_len)?;
                    return Err(Error::ProtocolError);
                }
                let mut body = [0u8; 3];
                read_exact(&mut self.connection, &mut body)?;
                Ok(Inbound::SubAck {
                    packet_id: u16::from_be_bytes([body[0], body[1]]),
                    code: body[2],
                })
            }
            _ => {
                discard(&mut self.connection, remaining_len)?;
                Ok(Inbound::Other)
            }
        }
    }

    fn read_publish(&mut self, header: u8, remaining_len: usize) -> Result<PublishPacket, Error> {
        if remaining_len > MAX_PACKET_LEN {
            discard(&mut self.connection, remaining_len)?;
            return Err(Error::BufferOverflow);
        }

        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();
        packet
            .resize(remaining_len, 0)
            .map_err(|_| Error::BufferOverflow)?;
        read_exact(&mut self.connection, &mut packet)?;

        if packet.len() < 2 {
            return Err(Error::ProtocolError);
        }
        let topic_len = u16::from_be_bytes([packet[0], packet[1]]) as usize;
        let mut offset = 2 + topic_len;
        if packet.len() < offset {
            return Err(Error::ProtocolError);
        }

        let topic_str =
            core::str::from_utf8(&packet[2..offset]).map_err(|_| Error::ProtocolError)?;
        let topic = String::try_from(topic_str).map_err(|_| Error::BufferOverflow)?;

        let qos = (header >> 1) & 0x03;
        if qos > 0 {
            if packet.len() < offset + 2 {
                return Err(Error::ProtocolError);
            }
            let packet_id = [packet[offset], packet[offset + 1]];
            offset += 2;
            if qos == QoS::AtLeastOnce as u8 {
                write_packet(&mut self.connection, PUBACK, &packet_id)?;
            }
        }

        let payload = Vec::from_slice(&packet[offset..]).map_err(|_| Error::BufferOverflow)?;

        Ok(PublishPacket { topic, payload })
    }

    fn hold(&mut self, packet: PublishPacket) {
        if let Err(packet) = self.pending.push_back(packet) {
            warn!("MQTT hold queue full, dropping oldest message");
            self.pending.pop_front();
            // A slot was just freed.
            let _ = self.pending.push_back(packet);
        }
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn track<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(
            Error::ReadError
            | Error::WriteError
            | Error::ConnectionClosed
            | Error::NotOpen
            | Error::ProtocolError,
        ) = result
        {
            self.is_connected = false;
        }
        result
    }

    fn take_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        // Packet id 0 is reserved.
        self.next_packet_id = self.next_packet_id.checked_add(1).unwrap_or(1);
        id
    }
}

fn put_u8<const N: usize>(buf: &mut Vec<u8, N>, value: u8) -> Result<(), Error> {
    buf.push(value).map_err(|_| Error::BufferOverflow)
}

fn put_u16<const N: usize>(buf: &mut Vec<u8, N>, value: u16) -> Result<(), Error> {
    buf.extend_from_slice(&value.to_be_bytes())
        .map_err(|_| Error::BufferOverflow)
}

/// Length-prefixed byte string, as used for topics, client id and credentials.
fn put_bytes<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(bytes.len()).map_err(|_| Error::BufferOverflow)?;
    put_u16(buf, len)?;
    buf.extend_from_slice(bytes)
        .map_err(|_| Error::BufferOverflow)
}

fn write_packet<C: Write>(connection: &mut C, header: u8, body: &[u8]) -> Result<(), Error> {
    let mut fixed_header: Vec<u8, 5> = Vec::new();
    put_u8(&mut fixed_header, header)?;
    encode_remaining_length(&mut fixed_header, body.len())?;

    write_all(connection, &fixed_header)?;
    write_all(connection, body)?;
    connection.flush().map_err(|_| Error::WriteError)
}

fn write_all<C: Write>(connection: &mut C, mut buf: &[u8]) -> Result<(), Error> {
    while !buf.is_empty() {
        match connection.write(buf) {
            Ok(0) => return Err(Error::WriteError),
            Ok(n) => buf = &buf[n..],
            Err(_) => return Err(Error::WriteError),
        }
    }
    Ok(())
}

fn read_exact<C: Read>(connection: &mut C, buf: &mut [u8]) -> Result<(), Error> {
    let mut total_read = 0;
    while total_read < buf.len() {
        match connection.read(&mut buf[total_read..]) {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(n) => total_read += n,
            Err(_) => return Err(Error::ReadError),
        }
    }
    Ok(())
}

fn discard<C: Read>(connection: &mut C, mut len: usize) -> Result<(), Error> {
    let mut scratch = [0u8; 64];
    while len > 0 {
        let chunk = len.min(scratch.len());
        read_exact(connection, &mut scratch[..chunk])?;
        len -= chunk;
    }
    Ok(())
}

/// Variable-length "remaining length" field: 7 bits per byte, high bit set
/// when another byte follows, at most 4 bytes.
fn encode_remaining_length(buf: &mut Vec<u8, 5>, mut len: usize) -> Result<(), Error> {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        put_u8(buf, byte)?;
        if len == 0 {
            return Ok(());
        }
        if buf.len() == 5 {
            return Err(Error::ProtocolError);
        }
    }
}

fn decode_remaining_length<C: Read>(connection: &mut C) -> Result<usize, Error> {
    let mut value = 0usize;
    let mut multiplier = 1usize;
    for _ in 0..4 {
        let mut byte = [0u8; 1];
        read_exact(connection, &mut byte)?;
        value += (byte[0] & 0x7F) as usize * multiplier;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
        multiplier *= 128;
    }
    Err(Error::ProtocolError)
}
