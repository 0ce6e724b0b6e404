//! Peer identifiers.
//!
//! A [`PeerId`] is the routing key for connection establishment: an opaque
//! string assigned by the identity provider when an endpoint registers, and
//! unique per endpoint for the lifetime of the session. Peerbeam never
//! inspects the contents; it only compares and forwards them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, broker-assigned identifier for a peer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Generate a fresh identifier.
    ///
    /// Used by identity providers when an endpoint registers; peers never
    /// mint their own identifiers.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// View the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_unique() {
        let a = PeerId::random();
        let b = PeerId::random();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_matches_as_str() {
        let id = PeerId::from("peer-1234");
        assert_eq!(id.to_string(), "peer-1234");
        assert_eq!(id.as_str(), "peer-1234");
    }

    #[test]
    fn test_serde_transparent() {
        let id = PeerId::from("abc");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"abc\"");
        let back: PeerId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
