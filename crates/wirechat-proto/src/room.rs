//! Conversation summary rows.
//!
//! Shape of the rooms listing returned by `GET /chat/rooms/{userId}`: one row
//! per conversation the user participates in, with last-message preview
//! fields for list rendering.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One conversation summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    /// Server-side room identifier
    pub id: u64,

    /// Participant ids as the server stores them: comma-separated
    pub participant_ids: String,

    /// Room creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,

    /// Content of the most recent message, for list previews
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,

    /// Time of the most recent message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<NaiveDateTime>,
}

impl ChatRoom {
    /// Participant ids parsed out of the server's comma-separated form.
    /// Entries that fail to parse are skipped.
    #[must_use]
    pub fn participants(&self) -> Vec<u64> {
        self.participant_ids.split(',').filter_map(|p| p.trim().parse().ok()).collect()
    }

    /// True if `user_id` participates in this room.
    #[must_use]
    pub fn involves(&self, user_id: u64) -> bool {
        self.participants().contains(&user_id)
    }
}
