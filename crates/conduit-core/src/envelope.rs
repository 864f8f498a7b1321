//! Bus envelopes and their payloads.
//!
//! An [`Envelope`] is the unit of routing on the message bus: who sent it,
//! what kind of message it is, and a JSON payload whose shape depends on the
//! kind. The typed payload structs mirror the field names the session handler
//! exchanges with chat adapters.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BusError, BusResult};

/// Kind of an envelope.
///
/// Adapters only consume a subset of these; anything else must be ignored
/// rather than treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MessageType {
    /// Raw user text produced by an adapter, awaiting hand-off to the session.
    ProcessUserMessage,
    /// User text addressed to the session handler.
    UserMessage,
    /// A finished reply for the user.
    BotResponse,
    /// The session failed to produce a reply.
    Error,
    /// A partial reply for streaming delivery.
    StreamingChunk,
}

impl MessageType {
    /// Returns the wire name of this message type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessUserMessage => "process_user_message",
            Self::UserMessage => "user_message",
            Self::BotResponse => "bot_response",
            Self::Error => "error",
            Self::StreamingChunk => "streaming_chunk",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message routed over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique id of this envelope.
    pub message_id: Uuid,
    /// Logical name of the sender.
    pub sender_id: String,
    /// Kind of message.
    pub message_type: MessageType,
    /// Kind-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Creates an envelope with a fresh id.
    pub fn new(sender_id: impl Into<String>, message_type: MessageType, payload: Value) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            message_type,
            payload,
        }
    }

    /// Creates an envelope from a typed payload.
    pub fn with_payload<T: Serialize>(
        sender_id: impl Into<String>,
        message_type: MessageType,
        payload: &T,
    ) -> BusResult<Self> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| BusError::MalformedPayload(e.to_string()))?;
        Ok(Self::new(sender_id, message_type, payload))
    }

    /// Decodes the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> BusResult<T> {
        T::deserialize(&self.payload).map_err(|e| {
            BusError::MalformedPayload(format!("{} payload: {e}", self.message_type))
        })
    }

    /// Returns a copy of this envelope with a new sender and type and a fresh id.
    ///
    /// The payload is carried over unchanged.
    pub fn readdressed(&self, sender_id: impl Into<String>, message_type: MessageType) -> Self {
        Self::new(sender_id, message_type, self.payload.clone())
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Payload of [`MessageType::ProcessUserMessage`] and [`MessageType::UserMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessagePayload {
    /// Platform user id, as a string.
    pub user_id: String,
    /// Conversation the message came from.
    pub chat_id: i64,
    /// Platform username, if the user has one.
    pub username: Option<String>,
    /// Message text.
    pub text: String,
    /// RFC 3339 receive time.
    pub timestamp: String,
}

/// Payload of [`MessageType::BotResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotResponsePayload {
    /// Conversation to answer.
    pub chat_id: i64,
    /// Reply text.
    pub text: String,
}

/// Payload of [`MessageType::Error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Conversation that was waiting for a reply.
    pub chat_id: i64,
    /// Template key describing the failure, e.g. `"api_error"`.
    #[serde(default)]
    pub error_type: Option<String>,
}
