//! # Larder
//!
//! The unified API for Larder - a registry where producers publish items
//! whose payload stays sealed, and anyone can pay to request disclosure.
//!
//! ## Overview
//!
//! - **Producer Directory**: identities registered to publish
//! - **Record Store**: items with an owner, a price and a one-way public flag
//! - **Access Control**: escrowed requests the owner approves or denies
//! - **Disclosure**: signed capabilities for an external encrypted-value store
//!
//! ## Key Concepts
//!
//! - **Request**: `Pending` until the owner resolves it, exactly once.
//! - **Escrow**: the full payment is held at request time and released once,
//!   to the owner on grant or back to the requester on deny.
//! - **Permission**: derived, never set. Owners and public items always
//!   grant it; otherwise only a settled grant does.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use larder::{Registry, RegistryConfig};
//! use larder::core::{Amount, Keypair, ProducerProfile};
//! use larder::escrow::MemoryRail;
//! use larder::store::SqliteStore;
//!
//! async fn example() -> larder::Result<()> {
//!     let store = SqliteStore::open("larder.db")?;
//!     let registry = Registry::new(
//!         Keypair::generate(),
//!         store,
//!         MemoryRail::new(),
//!         RegistryConfig::default(),
//!     );
//!
//!     let chef = Keypair::generate().identity();
//!     registry.register(&chef, &ProducerProfile::new("Chef Ada", "")).await?;
//!     let item = registry.publish(&chef, Amount::new(10), false).await?;
//!
//!     let diner = Keypair::generate().identity();
//!     registry.rail().fund(&diner, Amount::new(10)).await?;
//!     let request = registry.request_access(item, &diner, Amount::new(10)).await?;
//!     registry.approve(request, &chef).await?;
//!
//!     assert!(registry.check_access(&diner, item).await);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `larder::core` - Core primitives (Item, AccessRequest, Amount, etc.)
//! - `larder::store` - Storage abstraction and SQLite
//! - `larder::escrow` - Payment rail and escrow settlement

pub mod access;
pub mod config;
pub mod directory;
pub mod disclosure;
pub mod error;
pub mod records;
pub mod registry;

// Re-export component crates
pub use larder_core as core;
pub use larder_escrow as escrow;
pub use larder_store as store;

// Re-export main types for convenience
pub use config::RegistryConfig;
pub use disclosure::{DisclosureError, EncryptedValueStore, MemoryValueStore};
pub use error::{RegistryError, Result};
pub use registry::Registry;

// Re-export commonly used core types
pub use larder_core::{
    AccessRequest, Amount, Decision, DisclosureCapability, EscrowState, Identity, Item, ItemId,
    ItemView, Keypair, Producer, ProducerProfile, RequestId, RequestState,
};
