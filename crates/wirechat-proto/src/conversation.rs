//! Canonical conversation identifier.
//!
//! Either party may open a conversation first, so the identifier must be
//! symmetric in the participant pair. The pair is stored ordered, which makes
//! the symmetry invariant unrepresentable to violate; the wire form is
//! `{low}-{high}`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::errors::ProtocolError;

/// Identifier of a two-party conversation, independent of who opened it.
///
/// # Invariants
///
/// - `between(a, b) == between(b, a)` for all `a`, `b`.
/// - `low() <= high()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId {
    low: u64,
    high: u64,
}

impl ConversationId {
    /// Canonical identifier for the unordered pair `{a, b}`.
    #[must_use]
    pub fn between(a: u64, b: u64) -> Self {
        Self { low: a.min(b), high: a.max(b) }
    }

    /// Smaller participant id.
    #[must_use]
    pub fn low(&self) -> u64 {
        self.low
    }

    /// Larger participant id.
    #[must_use]
    pub fn high(&self) -> u64 {
        self.high
    }

    /// True if `id` is one of the two participants.
    #[must_use]
    pub fn involves(&self, id: u64) -> bool {
        self.low == id || self.high == id
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

impl FromStr for ConversationId {
    type Err = ProtocolError;

    /// Parse the `{a}-{b}` wire form. The pair is canonicalized, so both
    /// orders parse to the same identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ProtocolError::InvalidConversationId(s.to_string());
        let (a, b) = s.split_once('-').ok_or_else(&err)?;
        let a: u64 = a.parse().map_err(|_| err())?;
        let b: u64 = b.parse().map_err(|_| err())?;
        Ok(Self::between(a, b))
    }
}

impl Serialize for ConversationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
