//! # Larder Escrow
//!
//! Escrow settlement for Larder access requests.
//!
//! ## Overview
//!
//! Value moves through an external [`PaymentRail`]. [`Escrow`] wraps a rail
//! and exposes the two moves the registry makes: `hold` when a request is
//! created and `release` when it is resolved, to the owner on grant or back
//! to the requester on deny.
//!
//! [`MemoryRail`] is an in-memory rail with failure injection for tests.

pub mod error;
pub mod rail;
pub mod settlement;

pub use error::{EscrowError, Result};
pub use rail::memory::MemoryRail;
pub use rail::{Direction, PaymentRail, TransferReceipt};
pub use settlement::{Escrow, EscrowHandle};
