//! # Larder Store
//!
//! Storage abstraction for Larder. Provides a trait-based interface over the
//! authoritative ledger (producers, items, access requests and id counters)
//! with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts ledger storage behind the [`Store`] trait,
//! allowing the registry to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`Changeset`] - Staged writes committed all-or-nothing
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use larder_store::{Changeset, SqliteStore, Store};
//! use larder_core::{Amount, Identity, Item, ItemId};
//!
//! async fn example() -> larder_store::Result<()> {
//!     let store = SqliteStore::open("larder.db")?;
//!
//!     let owner = Identity::from_bytes([1u8; 32]);
//!     let id = store.next_item_id().await?;
//!     let item = Item::new(id, owner, Amount::new(10), false, 0);
//!     store.apply(&Changeset::new().put_item(item)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic commits**: a [`Changeset`] is applied in one transaction
//! - **Claim on commit**: id counters advance only when a write using the id commits
//! - **No deletion**: items and requests are retained as an audit record

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Changeset, Store, Write};
