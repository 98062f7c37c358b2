//! Lifecycle events.
//!
//! Broadcast by the [`crate::ConnectionManager`] to every interested
//! listener, since any open UI surface must learn of connectivity changes —
//! not just the caller that triggered the transition.

/// A connection lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Handshake succeeded and the inbound subscription is established.
    Connected {
        /// Identity the subscription is scoped to.
        identity: u64,
    },

    /// The connection was closed, explicitly or by transport failure.
    Disconnected,

    /// An initialize attempt failed during connect or handshake.
    ///
    /// The manager is back in the disconnected state; reconnection is
    /// manual, via a subsequent initialize.
    ConnectFailed {
        /// Failure description for the offline indicator.
        reason: String,
    },
}
