//! A store wrapper that fails on demand.
//!
//! [`FlakyStore`] delegates to any [`Store`] and can be armed to fail
//! commits or lookups, for exercising the registry's failure paths.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use larder_core::{AccessRequest, Identity, Item, ItemId, Producer, RequestId};
use larder_store::{Changeset, MemoryStore, Result, Store, StoreError};

#[derive(Debug, Default)]
struct Faults {
    pass_applies: u32,
    fail_applies: u32,
    fail_reads: bool,
}

/// A [`Store`] with injectable commit and lookup failures.
#[derive(Default)]
pub struct FlakyStore<S = MemoryStore> {
    inner: S,
    faults: Mutex<Faults>,
}

impl<S: Store> FlakyStore<S> {
    /// Wrap `inner` with no faults armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Let the next `pass` commits through, then fail the `fail` after them.
    pub fn fail_applies_after(&self, pass: u32, fail: u32) {
        let mut faults = self.faults();
        faults.pass_applies = pass;
        faults.fail_applies = fail;
    }

    /// Fail every lookup until switched off again.
    pub fn fail_reads(&self, on: bool) {
        self.faults().fail_reads = on;
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_fault(&self) -> Result<()> {
        if self.faults().fail_reads {
            return Err(StoreError::InvalidData("injected read failure".into()));
        }
        Ok(())
    }

    fn apply_fault(&self) -> Result<()> {
        let mut faults = self.faults();
        if faults.pass_applies > 0 {
            faults.pass_applies -= 1;
            return Ok(());
        }
        if faults.fail_applies > 0 {
            faults.fail_applies -= 1;
            return Err(StoreError::InvalidData("injected commit failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Store> Store for FlakyStore<S> {
    async fn get_producer(&self, identity: &Identity) -> Result<Option<Producer>> {
        self.read_fault()?;
        self.inner.get_producer(identity).await
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        self.read_fault()?;
        self.inner.get_item(id).await
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<AccessRequest>> {
        self.read_fault()?;
        self.inner.get_request(id).await
    }

    async fn items_by_owner(&self, owner: &Identity) -> Result<Vec<Item>> {
        self.read_fault()?;
        self.inner.items_by_owner(owner).await
    }

    async fn requests_for_item(&self, item_id: ItemId) -> Result<Vec<AccessRequest>> {
        self.read_fault()?;
        self.inner.requests_for_item(item_id).await
    }

    async fn requests_by_requester(&self, requester: &Identity) -> Result<Vec<AccessRequest>> {
        self.read_fault()?;
        self.inner.requests_by_requester(requester).await
    }

    async fn unsettled_requests(&self) -> Result<Vec<AccessRequest>> {
        self.read_fault()?;
        self.inner.unsettled_requests().await
    }

    async fn has_granted(&self, requester: &Identity, item_id: ItemId) -> Result<bool> {
        self.read_fault()?;
        self.inner.has_granted(requester, item_id).await
    }

    async fn next_item_id(&self) -> Result<ItemId> {
        self.read_fault()?;
        self.inner.next_item_id().await
    }

    async fn next_request_id(&self) -> Result<RequestId> {
        self.read_fault()?;
        self.inner.next_request_id().await
    }

    async fn apply(&self, changes: &Changeset) -> Result<()> {
        self.apply_fault()?;
        self.inner.apply(changes).await
    }
}
