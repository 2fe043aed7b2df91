//! Record Store operations.

use tracing::info;

use larder_core::{validate_price, Amount, Identity, Item, ItemId, ItemView};
use larder_escrow::PaymentRail;
use larder_store::{Changeset, Store};

use crate::error::{RegistryError, Result};
use crate::registry::{now_millis, Registry};

impl<S: Store, R: PaymentRail> Registry<S, R> {
    // ─────────────────────────────────────────────────────────────────────────
    // Item Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish a new item owned by `owner`.
    ///
    /// The item and the owner's incremented item count commit together.
    pub async fn publish(
        &self,
        owner: &Identity,
        price: Amount,
        initially_public: bool,
    ) -> Result<ItemId> {
        let _gate = self.gate().await;

        let producer = self
            .store
            .get_producer(owner)
            .await?
            .ok_or(RegistryError::NotRegistered(*owner))?;

        validate_price(price, &self.config.limits)?;

        let id = self.store.next_item_id().await?;
        let item = Item::new(id, *owner, price, initially_public, now_millis());

        self.commit(
            Changeset::new()
                .put_item(item)
                .put_producer(producer.with_item_published()),
        )
        .await?;

        info!(
            item = %id,
            owner = %owner,
            %price,
            public = initially_public,
            "item published"
        );
        Ok(id)
    }

    /// Make an item public. One-way; a no-op if already public.
    pub async fn set_public(&self, item_id: ItemId, caller: &Identity) -> Result<()> {
        let _gate = self.gate().await;

        let item = self.owned_item(item_id, caller).await?;
        if item.is_public {
            return Ok(());
        }

        self.commit(Changeset::new().put_item(item.made_public(now_millis())))
            .await?;

        info!(item = %item_id, "item made public");
        Ok(())
    }

    /// Change an item's price.
    pub async fn set_price(&self, item_id: ItemId, caller: &Identity, price: Amount) -> Result<()> {
        let _gate = self.gate().await;

        let item = self.owned_item(item_id, caller).await?;
        validate_price(price, &self.config.limits)?;

        self.commit(Changeset::new().put_item(item.repriced(price, now_millis())))
            .await?;

        info!(item = %item_id, old = %item.price, new = %price, "item repriced");
        Ok(())
    }

    /// Get the public view of an item.
    pub async fn get(&self, item_id: ItemId) -> Result<ItemView> {
        self.store
            .get_item(item_id)
            .await?
            .map(|item| item.view())
            .ok_or(RegistryError::ItemNotFound(item_id))
    }

    /// Items published by `owner`, ordered by id.
    pub async fn items_by_owner(&self, owner: &Identity) -> Result<Vec<ItemView>> {
        Ok(self
            .store
            .items_by_owner(owner)
            .await?
            .iter()
            .map(Item::view)
            .collect())
    }

    /// Load an item and check that `caller` owns it.
    async fn owned_item(&self, item_id: ItemId, caller: &Identity) -> Result<Item> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or(RegistryError::ItemNotFound(item_id))?;

        if !item.is_owned_by(caller) {
            return Err(RegistryError::NotOwner {
                caller: *caller,
                item: item_id,
            });
        }
        Ok(item)
    }
}
