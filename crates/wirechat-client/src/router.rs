//! Inbound frame router.
//!
//! Decodes frames arriving on the topic subscription and republishes them as
//! typed events on a broadcast channel. Delivery is broadcast, not queued:
//! with no listener registered at delivery time the message is lost. That is
//! a known limitation of the upstream design, tolerable because at most one
//! conversation view is mounted at a time.
//!
//! Parse failures are contained: the frame is logged and dropped, never
//! surfaced to listeners and never fatal to the subscription.

use tokio::sync::broadcast;
use wirechat_proto::{ChatMessage, Command, Frame};

/// Republishes inbound frames as typed message events.
#[derive(Debug)]
pub struct MessageRouter {
    tx: broadcast::Sender<ChatMessage>,
}

impl MessageRouter {
    /// Router with a broadcast channel of the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a listener for message events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.tx.subscribe()
    }

    /// Decode one inbound frame and broadcast it if it carries a message.
    pub fn route(&self, frame: &Frame) {
        match frame.command {
            Command::Message => match ChatMessage::from_json(&frame.body) {
                Ok(message) => {
                    tracing::debug!(
                        sender = message.sender_id,
                        receiver = message.receiver_id,
                        "message received"
                    );
                    if self.tx.send(message).is_err() {
                        tracing::debug!("no listeners registered; message lost");
                    }
                },
                Err(e) => tracing::warn!("dropping undecodable message frame: {e}"),
            },
            Command::Error => {
                tracing::warn!(message = frame.header("message"), "server reported an error");
            },
            other => tracing::debug!(command = %other, "ignoring frame"),
        }
    }
}
