//! # Larder Testkit
//!
//! Testing utilities for Larder.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for profiles, amounts and operation sequences
//! - **Fixtures**: A registry with a registered chef and funded diners
//! - **Fault injection**: [`FlakyStore`], a store that fails commits or lookups on demand
//!
//! ## Property Testing
//!
//! Drive a fixture with generated operations and check the ledger afterwards:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use larder_testkit::{generators::ops, RegistryFixture};
//!
//! proptest! {
//!     #[test]
//!     fn supply_is_conserved(ops in ops(32)) {
//!         let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//!         rt.block_on(async {
//!             let fixture = RegistryFixture::new(3).await;
//!             fixture.run(&ops).await;
//!             assert_eq!(fixture.total_supply().await, fixture.funded);
//!         });
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use larder_testkit::RegistryFixture;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let fixture = RegistryFixture::new(2).await;
//! let item = fixture.publish_private(10).await;
//! assert!(fixture.registry.check_access(&fixture.chef_id(), item).await);
//! # });
//! ```

pub mod fixtures;
pub mod flaky;
pub mod generators;

pub use flaky::FlakyStore;
pub use fixtures::{multi_party_identities, random_identity, RegistryFixture, RunLog, DEFAULT_FUNDING};
pub use generators::Op;
