//! Items: published records gating a private payload behind a price.

use serde::{Deserialize, Serialize};

use crate::crypto::Identity;
use crate::types::{Amount, ItemId};

/// A published item.
///
/// Items are never deleted: being present in the record store is what
/// "exists" means. Only the owner may change `price` or flip `is_public`,
/// and `is_public` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique, monotonically assigned id.
    pub id: ItemId,

    /// The producer that published the item. Immutable.
    pub owner: Identity,

    /// Whether the payload is disclosed to everyone.
    pub is_public: bool,

    /// Payment required to request access while private.
    pub price: Amount,

    /// When the item was published (Unix ms).
    pub published_at: i64,

    /// Last price or visibility change (Unix ms).
    pub updated_at: i64,
}

impl Item {
    /// Create a newly published item.
    pub fn new(id: ItemId, owner: Identity, price: Amount, is_public: bool, now: i64) -> Self {
        Self {
            id,
            owner,
            is_public,
            price,
            published_at: now,
            updated_at: now,
        }
    }

    /// Authorization predicate for owner-gated mutations.
    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        &self.owner == identity
    }

    /// Return a public copy. Already-public items are returned unchanged.
    pub fn made_public(&self, now: i64) -> Self {
        if self.is_public {
            return self.clone();
        }
        Self {
            is_public: true,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Return a copy with a new price.
    pub fn repriced(&self, price: Amount, now: i64) -> Self {
        Self {
            price,
            updated_at: now,
            ..self.clone()
        }
    }

    /// The externally visible projection of this item.
    pub fn view(&self) -> ItemView {
        ItemView {
            id: self.id,
            owner: self.owner,
            is_public: self.is_public,
            price: self.price,
        }
    }
}

/// What callers see of an item.
///
/// The encrypted payload is never part of the view; it is fetched from the
/// encrypted-value store with a disclosure capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: ItemId,
    pub owner: Identity,
    pub is_public: bool,
    pub price: Amount,
}
