//! The Registry: unified API for Larder.
//!
//! The Registry brings together the ledger store, escrow settlement and the
//! registry's signing identity. Its operations are split by component:
//!
//! - [`crate::directory`] - producer registration and lookups
//! - [`crate::records`] - item publication, visibility and pricing
//! - [`crate::access`] - access requests, resolution and permission checks
//! - [`crate::disclosure`] - capabilities for the encrypted-value store
//!
//! # Concurrency
//!
//! Every mutating operation holds a single mutation gate from validation
//! until its last commit, so mutations are processed one at a time in
//! arrival order. Lookups never take the gate and observe the latest
//! committed state.
//!
//! The gate is per registry, so a store must have exactly one registry
//! writing to it. Share the registry itself, e.g. behind an `Arc`, rather
//! than opening a second one over the same database.
//!
//! The gate is held across calls into the payment rail. A rail must not
//! call back into a mutating registry operation, or it will wait forever.

use tokio::sync::{Mutex, MutexGuard};

use larder_core::{Identity, Keypair};
use larder_escrow::{Escrow, PaymentRail};
use larder_store::{Changeset, Store};

use crate::config::RegistryConfig;
use crate::error::Result;

/// The main Registry struct.
///
/// Provides a unified API for:
/// - Registering producers
/// - Publishing and managing items
/// - Requesting, approving and denying access
/// - Checking permission and issuing disclosure capabilities
pub struct Registry<S: Store, R: PaymentRail> {
    /// The registry's signing keypair (capability issuer).
    pub(crate) keypair: Keypair,
    /// The storage backend.
    pub(crate) store: S,
    /// Escrow settlement over the payment rail.
    pub(crate) escrow: Escrow<R>,
    /// Configuration.
    pub(crate) config: RegistryConfig,
    /// Serializes mutations.
    gate: Mutex<()>,
}

impl<S: Store, R: PaymentRail> Registry<S, R> {
    /// Create a new registry instance.
    ///
    /// The registry takes ownership of `store` and must be its only writer:
    /// id allocation and resolution are serialized by this registry's gate
    /// alone.
    pub fn new(keypair: Keypair, store: S, rail: R, config: RegistryConfig) -> Self {
        Self {
            keypair,
            store,
            escrow: Escrow::new(rail),
            config,
            gate: Mutex::new(()),
        }
    }

    /// The identity capabilities are issued under.
    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the payment rail reference.
    pub fn rail(&self) -> &R {
        self.escrow.rail()
    }

    /// Get the configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Wait for exclusive mutation rights.
    pub(crate) async fn gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Commit staged writes.
    pub(crate) async fn commit(&self, changes: Changeset) -> Result<()> {
        self.store.apply(&changes).await?;
        Ok(())
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
