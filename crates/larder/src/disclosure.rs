//! Disclosure of encrypted payloads.
//!
//! The registry never sees payload contents. It issues a
//! [`DisclosureCapability`] to identities holding permission, and an
//! external [`EncryptedValueStore`] releases the sealed payload to whoever
//! presents a valid capability.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use larder_core::{CapabilityError, DisclosureCapability, Identity, ItemId};
use larder_escrow::PaymentRail;
use larder_store::Store;

use crate::error::{RegistryError, Result};
use crate::registry::{now_millis, Registry};

/// Reasons an encrypted-value store refuses to reveal a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisclosureError {
    /// The capability did not verify.
    #[error("capability rejected: {0}")]
    Capability(#[from] CapabilityError),

    /// The capability was issued for a different item.
    #[error("capability is for {actual}, not {expected}")]
    WrongItem { expected: ItemId, actual: ItemId },

    /// No payload is sealed under this item.
    #[error("no payload stored for {0}")]
    PayloadNotFound(ItemId),
}

/// The encrypted-value collaborator.
///
/// Implementations trust capabilities signed by the registry identity they
/// were configured with and never consult the registry's ledger.
#[async_trait]
pub trait EncryptedValueStore: Send + Sync {
    /// Release the payload of `item_id` to the capability's holder.
    async fn reveal(
        &self,
        item_id: ItemId,
        capability: &DisclosureCapability,
    ) -> std::result::Result<Bytes, DisclosureError>;
}

/// In-memory encrypted-value store.
///
/// Payloads are opaque sealed bytes; this store does not decrypt anything.
pub struct MemoryValueStore {
    issuer: Identity,
    sealed: RwLock<HashMap<ItemId, Bytes>>,
}

impl MemoryValueStore {
    /// Create a store that trusts capabilities signed by `issuer`.
    pub fn new(issuer: Identity) -> Self {
        Self {
            issuer,
            sealed: RwLock::new(HashMap::new()),
        }
    }

    /// Store the sealed payload for an item, replacing any previous one.
    pub async fn seal(&self, item_id: ItemId, payload: impl Into<Bytes>) {
        self.sealed.write().await.insert(item_id, payload.into());
    }

    /// Reveal as of a given time (Unix ms).
    pub async fn reveal_at(
        &self,
        item_id: ItemId,
        capability: &DisclosureCapability,
        now: i64,
    ) -> std::result::Result<Bytes, DisclosureError> {
        capability.verify(&self.issuer, now)?;

        if capability.item_id() != item_id {
            return Err(DisclosureError::WrongItem {
                expected: item_id,
                actual: capability.item_id(),
            });
        }

        let sealed = self.sealed.read().await;
        let payload = sealed
            .get(&item_id)
            .cloned()
            .ok_or(DisclosureError::PayloadNotFound(item_id))?;

        debug!(item = %item_id, holder = %capability.holder(), "payload revealed");
        Ok(payload)
    }
}

#[async_trait]
impl EncryptedValueStore for MemoryValueStore {
    async fn reveal(
        &self,
        item_id: ItemId,
        capability: &DisclosureCapability,
    ) -> std::result::Result<Bytes, DisclosureError> {
        self.reveal_at(item_id, capability, now_millis()).await
    }
}

impl<S: Store, R: PaymentRail> Registry<S, R> {
    // ─────────────────────────────────────────────────────────────────────────
    // Disclosure Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a disclosure capability to an identity holding permission.
    pub async fn issue_capability(
        &self,
        identity: &Identity,
        item_id: ItemId,
    ) -> Result<DisclosureCapability> {
        if self.store.get_item(item_id).await?.is_none() {
            return Err(RegistryError::ItemNotFound(item_id));
        }
        if !self.check_access(identity, item_id).await {
            return Err(RegistryError::AccessDenied {
                identity: *identity,
                item: item_id,
            });
        }

        let capability = DisclosureCapability::issue(
            &self.keypair,
            item_id,
            *identity,
            now_millis(),
            self.config.capability_ttl_ms,
        )?;

        info!(
            item = %item_id,
            holder = %identity,
            expires_at = capability.body.expires_at,
            "disclosure capability issued"
        );
        Ok(capability)
    }

    /// Fetch the sealed payload of `item_id` on behalf of `identity`.
    pub async fn disclose<V: EncryptedValueStore>(
        &self,
        values: &V,
        identity: &Identity,
        item_id: ItemId,
    ) -> Result<Bytes> {
        let capability = self.issue_capability(identity, item_id).await?;
        Ok(values.reveal(item_id, &capability).await?)
    }
}
