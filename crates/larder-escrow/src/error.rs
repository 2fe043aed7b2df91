//! Error types for escrow settlement.

use thiserror::Error;

use larder_core::{Amount, Identity};

/// Errors reported by a payment rail or the escrow on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    /// The paying party does not hold enough value.
    #[error("insufficient funds for {party}: required {required}, available {available}")]
    InsufficientFunds {
        party: Identity,
        required: Amount,
        available: Amount,
    },

    /// The rail could not complete the transfer.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// A balance would exceed the representable range.
    #[error("balance overflow")]
    Overflow,
}

/// Result type for escrow operations.
pub type Result<T> = std::result::Result<T, EscrowError>;
