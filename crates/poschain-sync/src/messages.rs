//! Sync protocol message types and their JSON wire envelope.
//!
//! Every message travels inside an [`Envelope`]:
//!
//! ```text
//! {"Type": 1..5, "SenderID": "...", "IntendedReceiver": "" | "...", "Message": <json>}
//! ```
//!
//! An empty `IntendedReceiver` means broadcast.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use poschain_core::Block;

use crate::error::{Result, SyncError};

/// Identity of a peer on the gossip topic.
///
/// Opaque to the protocol; only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random peer identity.
    pub fn random() -> Self {
        use rand::Rng;
        let bytes: [u8; 16] = rand::thread_rng().gen();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four characters, for compact display.
    pub fn short(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &self.0[start..]
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Numeric message type carried in the envelope's `Type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum MessageType {
    /// "Tell me your chain length." Broadcast.
    IndexRequest = 1,
    /// Reply to an index request. Targeted.
    IndexResponse = 2,
    /// A proposed new block. Broadcast.
    BlockAnnounce = 3,
    /// A full chain. Targeted.
    ChainResponse = 4,
    /// "Send me your full chain." Targeted.
    ChainRequest = 5,
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::IndexRequest),
            2 => Ok(MessageType::IndexResponse),
            3 => Ok(MessageType::BlockAnnounce),
            4 => Ok(MessageType::ChainResponse),
            5 => Ok(MessageType::ChainRequest),
            other => Err(format!("unknown message type {other}")),
        }
    }
}

/// Payload of an index response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPayload {
    /// The responder's chain length.
    #[serde(rename = "latestIndex")]
    pub latest_index: u64,
}

/// Decoded sync protocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    IndexRequest,
    IndexResponse { latest_index: u64 },
    BlockAnnounce(Block),
    ChainRequest,
    ChainResponse(Vec<Block>),
}

impl SyncMessage {
    pub fn kind(&self) -> MessageType {
        match self {
            SyncMessage::IndexRequest => MessageType::IndexRequest,
            SyncMessage::IndexResponse { .. } => MessageType::IndexResponse,
            SyncMessage::BlockAnnounce(_) => MessageType::BlockAnnounce,
            SyncMessage::ChainRequest => MessageType::ChainRequest,
            SyncMessage::ChainResponse(_) => MessageType::ChainResponse,
        }
    }

    /// Whether this message kind is always addressed to one peer.
    pub fn is_targeted(&self) -> bool {
        matches!(
            self,
            SyncMessage::IndexResponse { .. }
                | SyncMessage::ChainRequest
                | SyncMessage::ChainResponse(_)
        )
    }

    fn payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            SyncMessage::IndexRequest | SyncMessage::ChainRequest => serde_json::Value::Null,
            SyncMessage::IndexResponse { latest_index } => serde_json::to_value(IndexPayload {
                latest_index: *latest_index,
            })?,
            SyncMessage::BlockAnnounce(block) => serde_json::to_value(block)?,
            SyncMessage::ChainResponse(blocks) => serde_json::to_value(blocks)?,
        };
        Ok(value)
    }
}

/// The wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Type")]
    pub kind: MessageType,
    #[serde(rename = "SenderID")]
    pub sender_id: PeerId,
    #[serde(rename = "IntendedReceiver", default, with = "receiver")]
    pub intended_receiver: Option<PeerId>,
    #[serde(rename = "Message", default)]
    pub message: serde_json::Value,
}

impl Envelope {
    /// Wrap a message for broadcast or for a single receiver.
    pub fn new(sender: PeerId, receiver: Option<PeerId>, message: &SyncMessage) -> Result<Self> {
        Ok(Self {
            kind: message.kind(),
            sender_id: sender,
            intended_receiver: receiver,
            message: message.payload()?,
        })
    }

    /// Serialize to the JSON bytes handed to the transport.
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parse JSON bytes received from the transport.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| SyncError::MalformedEnvelope(e.to_string()))
    }

    /// Whether a peer with identity `me` should process this envelope.
    pub fn is_for(&self, me: &PeerId) -> bool {
        match &self.intended_receiver {
            Some(receiver) => receiver == me,
            None => true,
        }
    }

    /// Whether this envelope is a broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.intended_receiver.is_none()
    }

    /// Decode the typed payload.
    pub fn decode(&self) -> Result<SyncMessage> {
        let malformed = |e: serde_json::Error| {
            SyncError::MalformedEnvelope(format!("{:?} payload: {}", self.kind, e))
        };

        let message = match self.kind {
            MessageType::IndexRequest => SyncMessage::IndexRequest,
            MessageType::ChainRequest => SyncMessage::ChainRequest,
            MessageType::IndexResponse => {
                let payload: IndexPayload =
                    serde_json::from_value(self.message.clone()).map_err(malformed)?;
                SyncMessage::IndexResponse {
                    latest_index: payload.latest_index,
                }
            }
            MessageType::BlockAnnounce => {
                SyncMessage::BlockAnnounce(serde_json::from_value(self.message.clone()).map_err(malformed)?)
            }
            MessageType::ChainResponse => {
                SyncMessage::ChainResponse(serde_json::from_value(self.message.clone()).map_err(malformed)?)
            }
        };
        Ok(message)
    }
}

/// `IntendedReceiver` is an empty string for broadcasts.
mod receiver {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<PeerId>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_ref().map(PeerId::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<PeerId>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()).map(PeerId))
    }
}
