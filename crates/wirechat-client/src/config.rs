//! Client configuration.

use std::time::Duration;

/// Time allowed for the WebSocket open plus session handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Capacity of the lifecycle and message broadcast channels. A slow listener
/// that falls more than this many events behind observes a lag error and
/// skips ahead.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Endpoints and tunables for one [`crate::ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the push channel, e.g. `ws://host:8080/ws`
    pub ws_url: String,
    /// Base URL of the REST API, e.g. `http://host:8080/api`
    pub http_base_url: String,
    /// Timeout for completing the connection handshake
    pub handshake_timeout: Duration,
    /// Broadcast channel capacity
    pub channel_capacity: usize,
}

impl ClientConfig {
    /// Configuration for the given endpoints with default tunables.
    #[must_use]
    pub fn new(ws_url: impl Into<String>, http_base_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            http_base_url: http_base_url.into(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
