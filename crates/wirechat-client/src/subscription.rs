//! Topic subscription scoped to one identity.
//!
//! The transport delivers every message destined for an identity on a single
//! channel, `/topic/chat/{identityId}`; routing to a specific conversation
//! happens client-side. The [`crate::ConnectionManager`] owns at most one
//! live subscription at any time and replaces it on reconnect.

use wirechat_proto::Frame;

/// Destination prefix of the per-identity inbound channel.
pub const TOPIC_PREFIX: &str = "/topic/chat/";

/// Registration on the inbound channel of one identity.
///
/// A value object: it names the registration (deterministic id, so
/// release/replace is unambiguous) and builds the frames that establish and
/// release it. The owning manager decides when those frames are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSubscription {
    id: String,
    destination: String,
}

impl TopicSubscription {
    /// Subscription for the inbound channel of `identity`.
    #[must_use]
    pub fn for_identity(identity: u64) -> Self {
        Self { id: format!("sub-{identity}"), destination: format!("{TOPIC_PREFIX}{identity}") }
    }

    /// Deterministic subscription id (`sub-{identityId}`).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Destination this subscription is registered on.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Frame that establishes this subscription.
    #[must_use]
    pub fn subscribe_frame(&self) -> Frame {
        Frame::subscribe(&self.id, &self.destination)
    }

    /// Frame that releases this subscription.
    #[must_use]
    pub fn unsubscribe_frame(&self) -> Frame {
        Frame::unsubscribe(&self.id)
    }
}
