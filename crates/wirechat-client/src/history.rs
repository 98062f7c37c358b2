//! One-shot REST reads.
//!
//! Fetches conversation history and the rooms listing. Every failure path —
//! connection error, non-success status, empty body, unparseable body —
//! degrades to an empty list with a log line, never an error: a session
//! starts with no history rather than blocking or erroring the UI.

use serde::de::DeserializeOwned;
use wirechat_proto::{ChatMessage, ChatRoom, ConversationId};

/// Read-only client for the chat REST endpoints.
#[derive(Debug, Clone)]
pub struct HistoryLoader {
    http: reqwest::Client,
    base_url: String,
}

impl HistoryLoader {
    /// Loader for the API at `base_url` (no trailing slash required).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http: reqwest::Client::new(), base_url }
    }

    /// Historical messages of one conversation, in server order.
    ///
    /// The server sorts by persistence time; the client does not re-sort.
    pub async fn load(&self, conversation: ConversationId) -> Vec<ChatMessage> {
        self.fetch_list(&format!("{}/chat/history/{conversation}", self.base_url)).await
    }

    /// Conversation summaries for `user_id`, for list rendering.
    pub async fn rooms(&self, user_id: u64) -> Vec<ChatRoom> {
        self.fetch_list(&format!("{}/chat/rooms/{user_id}", self.base_url)).await
    }

    /// GET a JSON array, degrading to empty on any failure.
    async fn fetch_list<T: DeserializeOwned>(&self, url: &str) -> Vec<T> {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url, "fetch failed: {e}");
                return Vec::new();
            },
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "fetch refused");
            return Vec::new();
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(url, "response body unreadable: {e}");
                return Vec::new();
            },
        };
        if text.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str(&text) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(url, "response payload rejected: {e}");
                Vec::new()
            },
        }
    }
}
