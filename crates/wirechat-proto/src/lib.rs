//! Wire-level types for the wirechat protocol.
//!
//! Pure data layer shared by the client: the text frame codec spoken over
//! the WebSocket push channel, the JSON payloads it carries, and the
//! canonical conversation identifier. No I/O and no async — everything here
//! is synchronously testable.
//!
//! # Components
//!
//! - [`Frame`] / [`Command`]: STOMP 1.2-style text frame codec
//! - [`ChatMessage`] / [`MessageType`]: message payload (JSON, camelCase)
//! - [`ChatRoom`]: conversation summary row from the rooms listing
//! - [`ConversationId`]: symmetric identifier for a participant pair

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;

mod conversation;
mod frame;
mod message;
mod room;

pub use conversation::ConversationId;
pub use errors::ProtocolError;
pub use frame::{Command, Frame};
pub use message::{ChatMessage, MAX_CONTENT_CHARS, MessageType};
pub use room::ChatRoom;
