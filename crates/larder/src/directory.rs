//! Producer Directory operations.

use tracing::{info, warn};

use larder_core::{validate_profile, Identity, Producer, ProducerProfile};
use larder_escrow::PaymentRail;
use larder_store::{Changeset, Store};

use crate::error::{RegistryError, Result};
use crate::registry::{now_millis, Registry};

impl<S: Store, R: PaymentRail> Registry<S, R> {
    // ─────────────────────────────────────────────────────────────────────────
    // Producer Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register `identity` as a producer.
    ///
    /// The profile is validated and only its digest is kept.
    pub async fn register(&self, identity: &Identity, profile: &ProducerProfile) -> Result<()> {
        let _gate = self.gate().await;

        if self.store.get_producer(identity).await?.is_some() {
            return Err(RegistryError::AlreadyRegistered(*identity));
        }

        validate_profile(profile, &self.config.limits)?;
        let digest = profile.digest()?;

        let producer = Producer::new(
            *identity,
            digest,
            self.config.initial_reputation,
            now_millis(),
        );
        self.commit(Changeset::new().put_producer(producer)).await?;

        info!(
            producer = %identity,
            digest = %digest.to_hex(),
            "producer registered"
        );
        Ok(())
    }

    /// Check if `identity` is a registered producer.
    ///
    /// Never fails: a storage error reads as not registered.
    pub async fn is_registered(&self, identity: &Identity) -> bool {
        match self.store.get_producer(identity).await {
            Ok(producer) => producer.is_some(),
            Err(e) => {
                warn!(producer = %identity, error = %e, "registration lookup failed");
                false
            }
        }
    }

    /// Get a producer record.
    pub async fn producer(&self, identity: &Identity) -> Result<Option<Producer>> {
        Ok(self.store.get_producer(identity).await?)
    }

    /// Set a producer's reputation score.
    ///
    /// Reputation policy lives outside the registry; this only stores the
    /// score the collaborator computed.
    pub async fn update_reputation(&self, identity: &Identity, score: u32) -> Result<()> {
        let _gate = self.gate().await;

        let producer = self
            .store
            .get_producer(identity)
            .await?
            .ok_or(RegistryError::NotRegistered(*identity))?;

        let updated = Producer {
            reputation: score,
            ..producer
        };
        self.commit(Changeset::new().put_producer(updated)).await?;

        info!(producer = %identity, reputation = score, "reputation updated");
        Ok(())
    }
}
