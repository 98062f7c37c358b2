//! Error types for the wirechat wire layer.
//!
//! Strongly-typed errors for frame parsing and payload decoding. We avoid
//! `std::io::Error` in protocol logic to keep failure modes explicit and
//! matchable at the call site.

use thiserror::Error;

/// Errors produced while encoding or decoding wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame carried a command this protocol does not define
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Frame structure was invalid
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    /// A header line could not be parsed
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A header value used an escape sequence this protocol does not define
    #[error("invalid header escape in {0:?}")]
    InvalidEscape(String),

    /// Conversation identifier was not in `{low}-{high}` form
    #[error("invalid conversation id: {0:?}")]
    InvalidConversationId(String),

    /// JSON payload could not be encoded or decoded
    #[error("payload rejected: {0}")]
    Payload(String),
}

/// Convenience alias used throughout the wire layer.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Payload(err.to_string())
    }
}
