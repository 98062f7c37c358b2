//! Error types for the chat client.
//!
//! Only caller-actionable failures become errors; everything recoverable
//! (history fetch failures, undecodable inbound frames) is logged and
//! degraded in place per the subsystem's containment policy.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced to callers of the client API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Identity had no usable id
    #[error("invalid identity: id must be non-zero")]
    InvalidIdentity,

    /// Operation requires an established connection
    #[error("not connected")]
    NotConnected,

    /// Underlying transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
