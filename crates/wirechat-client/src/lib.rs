//! Connected chat client.
//!
//! Client-side core of the realtime two-party chat: a persistent push
//! connection shared process-wide, multiplexing inbound messages to the
//! active conversation and reconciling a one-shot history fetch with the
//! live stream.
//!
//! # Components
//!
//! - [`ConnectionManager`]: lifecycle state machine over the shared
//!   connection (initialize / is_ready / disconnect, lifecycle broadcast)
//! - [`TopicSubscription`]: the single per-identity inbound registration
//! - [`MessageRouter`]: decodes inbound frames into typed message events
//! - [`HistoryLoader`]: one-shot REST reads, degrading to empty on failure
//! - [`ConversationSession`]: history + live stream merged into one ordered
//!   view for a participant pair, with readiness-gated send
//!
//! # Usage
//!
//! The UI collaborator calls [`ConnectionManager::initialize`] at mount and
//! [`ConnectionManager::disconnect`] at unmount; in between it opens one
//! [`ConversationSession`] at a time and drives it via
//! [`ConversationSession::send`] and [`ConversationSession::messages`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod event;
mod history;
mod manager;
mod router;
mod session;
mod subscription;

pub mod transport;

pub use config::{ClientConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HANDSHAKE_TIMEOUT};
pub use error::ClientError;
pub use event::LifecycleEvent;
pub use history::HistoryLoader;
pub use manager::{ConnectionManager, ConnectionState, Identity};
pub use router::MessageRouter;
pub use session::{ConversationSession, SEND_DESTINATION, SendOutcome};
pub use subscription::{TOPIC_PREFIX, TopicSubscription};
pub use wirechat_proto::{ChatMessage, ChatRoom, ConversationId, Frame, MessageType};
