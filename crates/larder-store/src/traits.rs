//! Store trait: the abstract interface over the authoritative ledger.
//!
//! This trait allows the registry to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use larder_core::{AccessRequest, Identity, Item, ItemId, Producer, RequestId};

use crate::error::Result;

/// A single staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Insert or replace a producer record.
    PutProducer(Producer),
    /// Insert or replace an item record.
    PutItem(Item),
    /// Insert or replace an access request record.
    PutRequest(AccessRequest),
}

/// An ordered set of writes committed all-or-nothing.
///
/// Committing a `PutItem` or `PutRequest` advances the matching id counter
/// past the written id. Ids are therefore claimed only when a changeset
/// commits, and a failed commit leaves the counters untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    writes: Vec<Write>,
}

impl Changeset {
    /// Create an empty changeset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a producer write.
    pub fn put_producer(mut self, producer: Producer) -> Self {
        self.writes.push(Write::PutProducer(producer));
        self
    }

    /// Stage an item write.
    pub fn put_item(mut self, item: Item) -> Self {
        self.writes.push(Write::PutItem(item));
        self
    }

    /// Stage a request write.
    pub fn put_request(mut self, request: AccessRequest) -> Self {
        self.writes.push(Write::PutRequest(request));
        self
    }

    /// Staged writes, in commit order.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}

/// The Store trait: async interface for ledger persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic commits**: every mutation goes through [`Store::apply`]; readers
///   observe either none or all of a changeset.
/// - **Monotonic ids**: `next_item_id` / `next_request_id` only ever grow.
/// - **No deletion**: records are inserted or replaced, never removed.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a producer by identity.
    async fn get_producer(&self, identity: &Identity) -> Result<Option<Producer>>;

    /// Get an item by id.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// Get an access request by id.
    async fn get_request(&self, id: RequestId) -> Result<Option<AccessRequest>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Listings (ordered by id)
    // ─────────────────────────────────────────────────────────────────────────

    /// Items published by `owner`.
    async fn items_by_owner(&self, owner: &Identity) -> Result<Vec<Item>>;

    /// Requests made against `item_id`.
    async fn requests_for_item(&self, item_id: ItemId) -> Result<Vec<AccessRequest>>;

    /// Requests made by `requester`.
    async fn requests_by_requester(&self, requester: &Identity) -> Result<Vec<AccessRequest>>;

    /// Requests whose escrow is committed to a recipient but not yet paid out.
    async fn unsettled_requests(&self) -> Result<Vec<AccessRequest>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permission
    // ─────────────────────────────────────────────────────────────────────────

    /// Check if some settled grant exists for `(requester, item_id)`.
    async fn has_granted(&self, requester: &Identity, item_id: ItemId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Counters
    // ─────────────────────────────────────────────────────────────────────────

    /// The id the next published item will receive.
    async fn next_item_id(&self) -> Result<ItemId>;

    /// The id the next access request will receive.
    async fn next_request_id(&self) -> Result<RequestId>;

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Commit a changeset atomically.
    async fn apply(&self, changes: &Changeset) -> Result<()>;
}
