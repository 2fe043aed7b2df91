//! # Larder Core
//!
//! Pure primitives for Larder: producers, items, access requests, and the
//! capabilities that unlock disclosed payloads.
//!
//! This crate contains no I/O, no storage, no payment plumbing. It is pure
//! computation over the registry's records and their state transitions.
//!
//! ## Key Types
//!
//! - [`Producer`] - A registered identity allowed to publish
//! - [`Item`] - A published record with an owner, a price and a visibility flag
//! - [`AccessRequest`] - A paid request for disclosure, with its escrow state
//! - [`DisclosureCapability`] - Registry-signed permission to read a payload
//!
//! ## Canonicalization
//!
//! Profiles and capability bodies are encoded using deterministic CBOR. See
//! [`canonical`] module.

pub mod canonical;
pub mod capability;
pub mod crypto;
pub mod error;
pub mod item;
pub mod producer;
pub mod request;
pub mod types;
pub mod validation;

pub use canonical::{canonical_capability_bytes, canonical_profile_bytes};
pub use capability::{CapabilityBody, DisclosureCapability, CAPABILITY_DOMAIN};
pub use crypto::{Blake3Hash, Identity, Keypair, Signature};
pub use error::{CapabilityError, CoreError, TransitionError, ValidationError};
pub use item::{Item, ItemView};
pub use producer::{Producer, ProducerProfile};
pub use request::{AccessRequest, Decision, EscrowState, RequestState};
pub use types::{Amount, ItemId, RequestId};
pub use validation::{validate_price, validate_profile, ValidationLimits};
