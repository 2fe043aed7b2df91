//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use larder_core::{AccessRequest, Identity, Item, ItemId, Producer, RequestId};

use crate::error::{Result, StoreError};
use crate::traits::{Changeset, Store, Write};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Producers indexed by identity.
    producers: HashMap<Identity, Producer>,

    /// Items indexed by id. Ordered so listings come out by id.
    items: BTreeMap<ItemId, Item>,

    /// Requests indexed by id.
    requests: BTreeMap<RequestId, AccessRequest>,

    next_item_id: ItemId,
    next_request_id: RequestId,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                producers: HashMap::new(),
                items: BTreeMap::new(),
                requests: BTreeMap::new(),
                next_item_id: ItemId::FIRST,
                next_request_id: RequestId::FIRST,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_producer(&self, identity: &Identity) -> Result<Option<Producer>> {
        let inner = self.read()?;
        Ok(inner.producers.get(identity).cloned())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let inner = self.read()?;
        Ok(inner.items.get(&id).cloned())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<AccessRequest>> {
        let inner = self.read()?;
        Ok(inner.requests.get(&id).cloned())
    }

    async fn items_by_owner(&self, owner: &Identity) -> Result<Vec<Item>> {
        let inner = self.read()?;
        Ok(inner
            .items
            .values()
            .filter(|item| &item.owner == owner)
            .cloned()
            .collect())
    }

    async fn requests_for_item(&self, item_id: ItemId) -> Result<Vec<AccessRequest>> {
        let inner = self.read()?;
        Ok(inner
            .requests
            .values()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn requests_by_requester(&self, requester: &Identity) -> Result<Vec<AccessRequest>> {
        let inner = self.read()?;
        Ok(inner
            .requests
            .values()
            .filter(|r| &r.requester == requester)
            .cloned()
            .collect())
    }

    async fn unsettled_requests(&self) -> Result<Vec<AccessRequest>> {
        let inner = self.read()?;
        Ok(inner
            .requests
            .values()
            .filter(|r| r.is_unsettled())
            .cloned()
            .collect())
    }

    async fn has_granted(&self, requester: &Identity, item_id: ItemId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner
            .requests
            .values()
            .any(|r| r.item_id == item_id && &r.requester == requester && r.is_granted()))
    }

    async fn next_item_id(&self) -> Result<ItemId> {
        Ok(self.read()?.next_item_id)
    }

    async fn next_request_id(&self) -> Result<RequestId> {
        Ok(self.read()?.next_request_id)
    }

    async fn apply(&self, changes: &Changeset) -> Result<()> {
        let mut inner = self.write()?;

        for write in changes.writes() {
            match write {
                Write::PutProducer(producer) => {
                    inner.producers.insert(producer.identity, producer.clone());
                }
                Write::PutItem(item) => {
                    if item.id >= inner.next_item_id {
                        inner.next_item_id = item.id.next();
                    }
                    inner.items.insert(item.id, item.clone());
                }
                Write::PutRequest(request) => {
                    if request.id >= inner.next_request_id {
                        inner.next_request_id = request.id.next();
                    }
                    inner.requests.insert(request.id, request.clone());
                }
            }
        }

        debug!(writes = changes.len(), "applied changeset");
        Ok(())
    }
}
