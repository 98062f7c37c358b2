//! Chat message payload.
//!
//! JSON body carried by SEND/MESSAGE frames and returned by the history
//! endpoint. Field names are camelCase on the wire; `sentAt` is a zone-less
//! timestamp matching the server's `LocalDateTime` rendering.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{ConversationId, errors::Result};

/// Server-enforced upper bound on message content length, mirrored
/// client-side so oversized sends are refused before any network call.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Kind of content a message carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Plain text
    #[default]
    Text,
    /// Image attachment reference
    Image,
}

impl MessageType {
    /// Wire spelling of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
        }
    }
}

/// One chat message between two participants.
///
/// Outbound messages are built by [`ChatMessage::outbound`] and carry no
/// `id`/`sent_at`; the server assigns both when it persists the message and
/// loops the saved copy back on the subscription channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned identifier. `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Stable identifier of the sending participant
    pub sender_id: u64,

    /// Stable identifier of the receiving participant
    pub receiver_id: u64,

    /// Message content
    pub content: String,

    /// Kind of content. Defaults to [`MessageType::Text`] when absent.
    #[serde(default)]
    pub message_type: MessageType,

    /// Server-side persistence time. `None` for just-sent outbound messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<NaiveDateTime>,

    /// Receiver has viewed the message
    #[serde(default)]
    pub seen: bool,

    /// Server-side room row this message belongs to, when provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<String>,
}

impl ChatMessage {
    /// Build an outbound message from this client.
    ///
    /// No `id` or `sent_at` yet; the server supplies both on the loopback
    /// copy.
    #[must_use]
    pub fn outbound(
        sender_id: u64,
        receiver_id: u64,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            id: None,
            sender_id,
            receiver_id,
            content: content.into(),
            message_type,
            sent_at: None,
            seen: false,
            chat_room_id: None,
        }
    }

    /// Canonical conversation identifier for this message's participant pair.
    #[must_use]
    pub fn conversation(&self) -> ConversationId {
        ConversationId::between(self.sender_id, self.receiver_id)
    }

    /// Encode to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
