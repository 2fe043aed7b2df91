//! Producers: registered identities permitted to publish items.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_profile_bytes;
use crate::crypto::{Blake3Hash, Identity};
use crate::error::CoreError;

/// Display profile supplied at registration.
///
/// The directory validates the profile and keeps only its digest; rendering
/// and storing the profile body belongs to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerProfile {
    /// Public display name. Must be non-empty.
    pub display_name: String,

    /// Free-form description.
    pub bio: String,

    /// Optional contact handle.
    pub contact: Option<String>,
}

impl ProducerProfile {
    /// Create a profile without a contact handle.
    pub fn new(display_name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            bio: bio.into(),
            contact: None,
        }
    }

    /// Attach a contact handle.
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// Blake3 digest of the canonical encoding.
    pub fn digest(&self) -> Result<Blake3Hash, CoreError> {
        let bytes = canonical_profile_bytes(self)?;
        Ok(Blake3Hash::hash(&bytes))
    }
}

/// A registered producer.
///
/// Only registered identities have a record, so the presence of a
/// `Producer` is the registration flag. Records are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    /// The producer's identity. Immutable.
    pub identity: Identity,

    /// Number of items this producer has published.
    pub item_count: u64,

    /// Reputation score, maintained by an external collaborator.
    pub reputation: u32,

    /// Digest of the profile supplied at registration.
    pub profile_digest: Blake3Hash,

    /// When the producer registered (Unix ms).
    pub registered_at: i64,
}

impl Producer {
    /// Create a freshly registered producer with no items.
    pub fn new(
        identity: Identity,
        profile_digest: Blake3Hash,
        reputation: u32,
        registered_at: i64,
    ) -> Self {
        Self {
            identity,
            item_count: 0,
            reputation,
            profile_digest,
            registered_at,
        }
    }

    /// Return a copy with one more published item.
    pub fn with_item_published(&self) -> Self {
        Self {
            item_count: self.item_count.saturating_add(1),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_producer_has_no_items() {
        let identity = Identity::from_bytes([0x11; 32]);
        let producer = Producer::new(identity, Blake3Hash::ZERO, 100, 1000);

        assert_eq!(producer.item_count, 0);
        assert_eq!(producer.reputation, 100);
        assert_eq!(producer.with_item_published().item_count, 1);
        assert_eq!(producer.item_count, 0);
    }

    #[test]
    fn test_profile_digest_tracks_content() {
        let a = ProducerProfile::new("Chef Ada", "bread");
        let b = ProducerProfile::new("Chef Ada", "cake");

        assert_eq!(a.digest().unwrap(), a.clone().digest().unwrap());
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }
}
