//! Conversation session.
//!
//! Client-side aggregate of one participant pair's conversation: the history
//! snapshot merged with the live stream into a single append-only, ordered
//! view, plus the readiness-gated send path.
//!
//! # Invariant
//!
//! At most one `ConversationSession` is mounted per
//! [`crate::ConnectionManager`] lifetime. The session appends every message
//! the router delivers without filtering by conversation — the upstream
//! design relies on one active conversation view at a time, and adding a
//! filter here would change observable behavior.
//!
//! # Ordering
//!
//! Insertion order: the history snapshot (server-ordered), then live
//! arrivals in arrival order. No re-sort. A live frame that lands while the
//! history fetch is still in flight appears ahead of the snapshot; that race
//! is accepted, not reconciled.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use wirechat_proto::{ChatMessage, ConversationId, Frame, MAX_CONTENT_CHARS, MessageType};

use crate::{ConnectionManager, HistoryLoader};

/// Destination outbound messages are written to.
pub const SEND_DESTINATION: &str = "/app/chat";

/// Result of a send attempt.
///
/// Refusals are outcomes, not errors: the caller surfaces them as a disabled
/// affordance, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message written to the transport.
    Sent,
    /// Connection not ready (or lost mid-send); nothing was written.
    NotConnected,
    /// Content empty after trimming; nothing was written.
    EmptyContent,
    /// Content exceeds the server's length bound; nothing was written.
    TooLong,
    /// Session addresses itself; the server would refuse it.
    SelfAddressed,
}

impl SendOutcome {
    /// True if the message was written to the transport.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        *self == Self::Sent
    }
}

/// One mounted conversation between `sender_id` and `receiver_id`.
///
/// Dropping the session unmounts it: the live tap ends. The shared
/// [`ConnectionManager`] persists across sessions.
pub struct ConversationSession {
    manager: ConnectionManager,
    sender_id: u64,
    receiver_id: u64,
    conversation: ConversationId,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    pump: tokio::task::JoinHandle<()>,
}

impl ConversationSession {
    /// Mount a session for the (sender, receiver) pair.
    ///
    /// Taps the live stream first, then fetches history once and seeds the
    /// message list with the result, so frames racing the fetch are kept
    /// (ahead of the snapshot — see the module ordering note). A failed
    /// fetch seeds an empty list.
    pub async fn open(
        manager: ConnectionManager,
        history: &HistoryLoader,
        sender_id: u64,
        receiver_id: u64,
    ) -> Self {
        let conversation = ConversationId::between(sender_id, receiver_id);
        let messages = Arc::new(Mutex::new(Vec::new()));

        let live = manager.messages();
        let sink = Arc::clone(&messages);
        let pump = tokio::spawn(async move {
            Self::pump(live, sink).await;
        });

        let snapshot = history.load(conversation).await;
        tracing::debug!(%conversation, count = snapshot.len(), "session mounted");
        lock(&messages).extend(snapshot);

        Self { manager, sender_id, receiver_id, conversation, messages, pump }
    }

    /// Append live arrivals until the router broadcast closes.
    async fn pump(
        mut live: broadcast::Receiver<ChatMessage>,
        sink: Arc<Mutex<Vec<ChatMessage>>>,
    ) {
        loop {
            match live.recv().await {
                // No conversation filter: one session is mounted at a time.
                Ok(message) => lock(&sink).push(message),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "live stream lagged; messages dropped");
                },
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Canonical identifier of this conversation.
    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation
    }

    /// Identity this session sends as.
    #[must_use]
    pub fn sender_id(&self) -> u64 {
        self.sender_id
    }

    /// Identity this session sends to.
    #[must_use]
    pub fn receiver_id(&self) -> u64 {
        self.receiver_id
    }

    /// Snapshot of the merged, ordered message list.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        lock(&self.messages).clone()
    }

    /// Register a listener on the live stream, for UI surfaces that render
    /// incrementally instead of polling [`Self::messages`].
    #[must_use]
    pub fn updates(&self) -> broadcast::Receiver<ChatMessage> {
        self.manager.messages()
    }

    /// Send `content` to this session's receiver.
    ///
    /// Requires manager readiness and non-empty trimmed content; refused
    /// sends perform no network call. No local echo is stored: the server
    /// loops the saved message back on the subscription channel, and storing
    /// a copy here would double-render it.
    pub async fn send(&self, content: &str, message_type: MessageType) -> SendOutcome {
        if !self.manager.is_ready() {
            tracing::debug!("send refused; connection not ready");
            return SendOutcome::NotConnected;
        }
        let trimmed = content.trim();
        if trimmed.is_empty() {
            tracing::debug!("send refused; empty content");
            return SendOutcome::EmptyContent;
        }
        if trimmed.chars().count() > MAX_CONTENT_CHARS {
            tracing::debug!(chars = trimmed.chars().count(), "send refused; content too long");
            return SendOutcome::TooLong;
        }
        if self.sender_id == self.receiver_id {
            tracing::debug!("send refused; self-addressed");
            return SendOutcome::SelfAddressed;
        }

        let message =
            ChatMessage::outbound(self.sender_id, self.receiver_id, trimmed, message_type);
        let body = match message.to_json() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("outbound message encoding failed: {e}");
                return SendOutcome::NotConnected;
            },
        };

        match self.manager.send_frame(Frame::send_to(SEND_DESTINATION, body)).await {
            Ok(()) => {
                tracing::debug!(conversation = %self.conversation, "message sent");
                SendOutcome::Sent
            },
            Err(_) => {
                tracing::warn!("send failed; connection lost mid-send");
                SendOutcome::NotConnected
            },
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        // Unmount: end the live tap. A history fetch still in flight
        // resolves into the aborted task's sink and is silently discarded.
        self.pump.abort();
    }
}

fn lock<'a>(
    messages: &'a Arc<Mutex<Vec<ChatMessage>>>,
) -> std::sync::MutexGuard<'a, Vec<ChatMessage>> {
    messages.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use crate::ClientConfig;

    use super::*;

    fn dead_manager() -> ConnectionManager {
        ConnectionManager::new(ClientConfig::new("ws://127.0.0.1:9/ws", "http://127.0.0.1:9"))
    }

    #[tokio::test]
    async fn opens_empty_when_history_unavailable() {
        let manager = dead_manager();
        let history = HistoryLoader::new("http://127.0.0.1:9");
        let session = ConversationSession::open(manager, &history, 5, 12).await;

        assert_eq!(session.conversation_id(), ConversationId::between(12, 5));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn send_is_refused_when_not_ready() {
        let manager = dead_manager();
        let history = HistoryLoader::new("http://127.0.0.1:9");
        let session = ConversationSession::open(manager, &history, 5, 12).await;

        let outcome = session.send("hello", MessageType::Text).await;
        assert_eq!(outcome, SendOutcome::NotConnected);
        assert!(!outcome.is_sent());
    }
}
