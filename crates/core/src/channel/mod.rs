//! Frame protocol and transport abstraction.
//!
//! All frames are JSON, length-prefixed (4-byte big-endian length, then JSON
//! bytes). A [`Connection`] is one end of an established bidirectional frame
//! channel: transports hand out connections and the session layer never sees
//! anything below them. The in-memory transport lives in [`memory`]; real
//! network transports are external and only need to produce the same queue
//! pair.

pub mod memory;

use crate::error::{Error, Result};
use crate::identity::IdentityClaim;
use crate::rendezvous::SessionId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Maximum frame size (64KB).
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// One logical protocol message unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Frame {
    /// A chat text message.
    Message(String),
    /// A control action.
    Action(Action),
    /// The sender's identity claim.
    Identification(IdentityClaim),
}

/// Control actions carried by [`Frame::Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    StartTyping,
    EndTyping,
    RequestIdentification,
}

impl Frame {
    /// Encode a frame for sending (length-prefixed JSON).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let len = json.len() as u32;
        let mut buf = Vec::with_capacity(4 + json.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&json);
        Ok(buf)
    }

    /// Decode a frame from bytes (expects length prefix already stripped).
    pub fn decode(data: &[u8]) -> Result<Self> {
        let frame = serde_json::from_slice(data)?;
        Ok(frame)
    }

    /// Decode a full wire buffer including its length prefix.
    pub fn decode_wire(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::Channel("truncated frame".to_string()));
        }

        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        if len > MAX_FRAME_SIZE {
            return Err(Error::Channel(format!("frame too large: {} bytes", len)));
        }
        if data.len() - 4 != len as usize {
            return Err(Error::Channel(format!(
                "frame length mismatch: prefix says {}, got {}",
                len,
                data.len() - 4
            )));
        }

        Self::decode(&data[4..])
    }
}

/// Events delivered by [`Connection::recv`].
///
/// There is no explicit open event: a connection is open from the moment a
/// transport returns it.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A frame arrived from the peer.
    Frame(Frame),
    /// The peer closed its end. Delivered exactly once.
    Closed,
    /// The transport reported an error for this connection.
    Error(String),
}

/// A channel endpoint bound to this party's session identifier.
///
/// Mirrors the two roles of session setup: the host waits for the joiner to
/// arrive, the joiner dials the host's identifier and attaches its identity
/// claim as connection metadata.
#[allow(async_fn_in_trait)]
pub trait Channel {
    /// Dial a remote identifier (joiner role).
    async fn connect(&mut self, remote: &SessionId, metadata: IdentityClaim) -> Result<Connection>;

    /// Wait for an inbound connection (host role).
    async fn accept(&mut self) -> Result<Connection>;
}

/// One end of an established bidirectional frame channel.
#[derive(Debug)]
pub struct Connection {
    metadata: Option<IdentityClaim>,
    outbound: Option<mpsc::Sender<Vec<u8>>>,
    inbound: mpsc::Receiver<Vec<u8>>,
    remote_closed: bool,
}

impl Connection {
    /// Assemble a connection from its transport queues.
    ///
    /// `metadata` is the claim the dialing side attached, present on the
    /// accepting side only.
    pub fn new(
        metadata: Option<IdentityClaim>,
        outbound: mpsc::Sender<Vec<u8>>,
        inbound: mpsc::Receiver<Vec<u8>>,
    ) -> Self {
        Self {
            metadata,
            outbound: Some(outbound),
            inbound,
            remote_closed: false,
        }
    }

    /// The claim the dialing side attached when connecting, if any.
    pub fn remote_metadata(&self) -> Option<&IdentityClaim> {
        self.metadata.as_ref()
    }

    /// Send a frame to the peer.
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let Some(outbound) = &self.outbound else {
            return Err(Error::Channel("connection is closed".to_string()));
        };

        let encoded = frame.encode()?;
        outbound
            .send(encoded)
            .await
            .map_err(|_| Error::Channel("peer connection lost".to_string()))
    }

    /// Receive the next channel event.
    ///
    /// Returns [`ChannelEvent::Closed`] exactly once when the peer goes
    /// away, then `None` forever after.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        if self.remote_closed {
            return None;
        }

        match self.inbound.recv().await {
            Some(bytes) => match Frame::decode_wire(&bytes) {
                Ok(frame) => Some(ChannelEvent::Frame(frame)),
                Err(err) => Some(ChannelEvent::Error(err.to_string())),
            },
            None => {
                self.remote_closed = true;
                Some(ChannelEvent::Closed)
            }
        }
    }

    /// Close this end. Idempotent; the peer observes a close event.
    pub fn close(&mut self) {
        self.outbound = None;
    }

    /// Whether this end has been closed locally.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_none()
    }
}
