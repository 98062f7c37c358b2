//! Connection lifecycle state machine.
//!
//! Manages the single shared push connection: open, handshake, subscription
//! establishment, teardown, and lifecycle broadcast.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ initialize ┌────────────┐  handshake ok  ┌───────────┐
//! │ Disconnected │───────────>│ Connecting │───────────────>│ Connected │
//! └──────────────┘            └────────────┘                └───────────┘
//!        ↑                          │                             │
//!        │       handshake failed   │     disconnect / transport  │
//!        └──────────────────────────┴─────────────────────────────┘
//! ```
//!
//! Re-entrant `initialize` calls while Connecting or Connected are no-ops;
//! reconnection is manual, triggered only by a subsequent `initialize` after
//! the manager has returned to Disconnected. There is no automatic retry.
//!
//! The manager is the process-wide connection owner: construct one, share it
//! by cloning the handle. All mutation happens in short critical sections
//! under a mutex that is never held across an await point.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::{broadcast, mpsc};
use wirechat_proto::{ChatMessage, Frame};

use crate::{
    ClientConfig, ClientError, LifecycleEvent,
    router::MessageRouter,
    subscription::TopicSubscription,
    transport::{self, ConnectedTransport},
};

/// Time the I/O task gets to flush teardown frames before it is stopped.
const DISCONNECT_GRACE: Duration = Duration::from_millis(250);

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection. The only state `initialize` acts from.
    Disconnected,
    /// Transport open and handshake in flight.
    Connecting,
    /// Handshake complete, subscription established.
    Connected,
}

/// Stable identifier of the connected participant.
///
/// The zero id stands in for the upstream's "null / undefined id" and is
/// rejected by [`ConnectionManager::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Participant id.
    pub id: u64,
}

impl Identity {
    /// Identity with the given id.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// True if the id is usable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.id != 0
    }
}

/// Mutable connection state, guarded by the manager's mutex.
struct Shared {
    state: ConnectionState,
    identity: Option<Identity>,
    to_server: Option<mpsc::Sender<Frame>>,
    io_abort: Option<tokio::task::AbortHandle>,
    subscription: Option<TopicSubscription>,
    /// Incremented per established connection; a router pump from an older
    /// connection must not clobber the state of a newer one.
    epoch: u64,
}

struct Inner {
    config: ClientConfig,
    shared: Mutex<Shared>,
    lifecycle: broadcast::Sender<LifecycleEvent>,
    router: MessageRouter,
}

/// Owner of the single shared push connection.
///
/// Cheap to clone; every clone addresses the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Manager in the Disconnected state.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let (lifecycle, _) = broadcast::channel(config.channel_capacity);
        let router = MessageRouter::new(config.channel_capacity);
        let shared = Mutex::new(Shared {
            state: ConnectionState::Disconnected,
            identity: None,
            to_server: None,
            io_abort: None,
            subscription: None,
            epoch: 0,
        });
        Self { inner: Arc::new(Inner { config, shared, lifecycle, router }) }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Identity passed to the most recent `initialize`. `None` before the
    /// first call.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock().identity
    }

    /// True iff the connection is established and the transport handle is
    /// live.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let shared = self.inner.lock();
        shared.state == ConnectionState::Connected && shared.to_server.is_some()
    }

    /// Register a listener for lifecycle transitions.
    #[must_use]
    pub fn lifecycle_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.lifecycle.subscribe()
    }

    /// Register a listener for inbound messages (the router broadcast).
    ///
    /// The channel survives reconnects: listeners keep their registration
    /// across a disconnect/initialize cycle.
    #[must_use]
    pub fn messages(&self) -> broadcast::Receiver<ChatMessage> {
        self.inner.router.subscribe()
    }

    /// Open the connection for `identity`.
    ///
    /// Idempotent: while Connecting or Connected this returns immediately
    /// without a second connect attempt. On handshake failure the manager
    /// returns to Disconnected, broadcasts `ConnectFailed` exactly once, and
    /// returns the error.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidIdentity`] if `identity` has a zero id
    /// - [`ClientError::Transport`] if connect or handshake fails
    pub async fn initialize(&self, identity: Identity) -> Result<(), ClientError> {
        if !identity.is_valid() {
            return Err(ClientError::InvalidIdentity);
        }

        {
            let mut shared = self.inner.lock();
            if shared.state != ConnectionState::Disconnected {
                tracing::debug!(state = ?shared.state, "initialize ignored; already active");
                return Ok(());
            }
            shared.state = ConnectionState::Connecting;
            shared.identity = Some(identity);
        }

        tracing::info!(identity = identity.id, url = %self.inner.config.ws_url, "connecting");
        let transport =
            transport::connect(&self.inner.config.ws_url, self.inner.config.handshake_timeout)
                .await;

        match transport {
            Ok(transport) => self.on_connected(identity, transport).await,
            Err(e) => {
                self.inner.lock().state = ConnectionState::Disconnected;
                tracing::warn!("connect failed: {e}");
                let _ = self
                    .inner
                    .lifecycle
                    .send(LifecycleEvent::ConnectFailed { reason: e.to_string() });
                Err(e.into())
            },
        }
    }

    /// Install the established transport and (re-)establish the topic
    /// subscription for `identity`.
    async fn on_connected(
        &self,
        identity: Identity,
        transport: ConnectedTransport,
    ) -> Result<(), ClientError> {
        let to_server = transport.to_server.clone();
        let io_abort = transport.abort_handle();
        let frames = transport.from_server;

        let subscription = TopicSubscription::for_identity(identity.id);
        let subscribe_frame = subscription.subscribe_frame();

        let epoch = {
            let mut shared = self.inner.lock();
            if shared.state != ConnectionState::Connecting {
                // disconnect() raced the handshake; discard the connection.
                drop(shared);
                io_abort.abort();
                tracing::debug!("connection discarded; disconnected while connecting");
                return Ok(());
            }
            if let Some(stale) = shared.subscription.take() {
                // At most one live subscription per identity: the previous
                // registration died with its transport, release the handle.
                tracing::debug!(id = stale.id(), "releasing previous subscription");
            }
            shared.state = ConnectionState::Connected;
            shared.to_server = Some(to_server.clone());
            shared.io_abort = Some(io_abort);
            shared.subscription = Some(subscription);
            shared.epoch += 1;
            shared.epoch
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            Inner::pump(inner, frames, epoch).await;
        });

        if to_server.send(subscribe_frame).await.is_err() {
            tracing::warn!("subscription not established; transport closed early");
        }

        tracing::info!(identity = identity.id, "connected");
        let _ = self.inner.lifecycle.send(LifecycleEvent::Connected { identity: identity.id });
        Ok(())
    }

    /// Close the connection.
    ///
    /// Releases the topic subscription, closes the transport, and returns to
    /// Disconnected. Safe to call when already disconnected (no-op beyond
    /// clearing references); teardown failures are swallowed and logged —
    /// disconnect never fails observably.
    pub async fn disconnect(&self) {
        let (was_active, to_server, io_abort, subscription) = {
            let mut shared = self.inner.lock();
            let was_active = shared.state != ConnectionState::Disconnected;
            shared.state = ConnectionState::Disconnected;
            (
                was_active,
                shared.to_server.take(),
                shared.io_abort.take(),
                shared.subscription.take(),
            )
        };

        if let (Some(to_server), Some(subscription)) = (&to_server, &subscription) {
            // Best-effort goodbye; the socket may already be gone.
            let polite = to_server.send(subscription.unsubscribe_frame()).await.is_ok()
                && to_server.send(Frame::disconnect()).await.is_ok();
            if !polite {
                tracing::debug!("teardown frames not delivered; transport already closed");
            }
        }
        // Dropping the last sender lets the I/O task drain the queued
        // teardown frames and exit on its own; the deferred abort only
        // catches a wedged socket.
        drop(to_server);
        if let Some(io_abort) = io_abort {
            tokio::spawn(async move {
                tokio::time::sleep(DISCONNECT_GRACE).await;
                io_abort.abort();
            });
        }

        if was_active {
            tracing::info!("disconnected");
            let _ = self.inner.lifecycle.send(LifecycleEvent::Disconnected);
        }
    }

    /// Write a frame through the transport. Requires `is_ready()`.
    pub(crate) async fn send_frame(&self, frame: Frame) -> Result<(), ClientError> {
        let to_server = {
            let shared = self.inner.lock();
            if shared.state == ConnectionState::Connected {
                shared.to_server.clone()
            } else {
                None
            }
        };
        let to_server = to_server.ok_or(ClientError::NotConnected)?;
        to_server.send(frame).await.map_err(|_| ClientError::NotConnected)
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed inbound frames to the router until the transport ends, then
    /// record the loss (unless a newer connection or an explicit disconnect
    /// already moved the state on).
    async fn pump(inner: Arc<Self>, mut frames: mpsc::Receiver<Frame>, epoch: u64) {
        while let Some(frame) = frames.recv().await {
            inner.router.route(&frame);
        }

        let lost = {
            let mut shared = inner.lock();
            if shared.epoch == epoch && shared.state == ConnectionState::Connected {
                shared.state = ConnectionState::Disconnected;
                shared.to_server = None;
                shared.io_abort = None;
                shared.subscription = None;
                true
            } else {
                false
            }
        };
        if lost {
            tracing::warn!("connection lost");
            let _ = inner.lifecycle.send(LifecycleEvent::Disconnected);
        }
    }
}
