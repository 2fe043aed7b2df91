//! Error types for the Registry.

use larder_core::{
    Amount, CoreError, Identity, ItemId, RequestId, RequestState, TransitionError,
    ValidationError,
};
use larder_escrow::EscrowError;
use larder_store::StoreError;
use thiserror::Error;

use crate::disclosure::DisclosureError;

/// Errors that can occur during Registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Item not found.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// Access request not found.
    #[error("request not found: {0}")]
    RequestNotFound(RequestId),

    /// The identity has no producer record.
    #[error("not a registered producer: {0}")]
    NotRegistered(Identity),

    /// The identity already has a producer record.
    #[error("already registered: {0}")]
    AlreadyRegistered(Identity),

    /// The caller does not own the item.
    #[error("{caller} does not own {item}")]
    NotOwner { caller: Identity, item: ItemId },

    /// The request has already left `Pending`.
    #[error("{request} already processed: state is {state:?}")]
    AlreadyProcessed {
        request: RequestId,
        state: RequestState,
    },

    /// Access was requested for an item that is already public.
    #[error("{0} is public; no request needed")]
    AlreadyPublic(ItemId),

    /// The owner requested access to their own item.
    #[error("owner cannot request access to own {0}")]
    OwnerRequest(ItemId),

    /// Price above the configured ceiling.
    #[error("invalid price {price}: maximum is {max}")]
    InvalidPrice { price: Amount, max: Amount },

    /// Profile failed validation.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// Payment below the item price.
    #[error("insufficient payment: offered {offered}, price is {required}")]
    InsufficientPayment { required: Amount, offered: Amount },

    /// The payment rail could not move the funds.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] EscrowError),

    /// The payout failed and restoring the pending request failed too.
    ///
    /// The request stays `Releasing` with its funds in escrow until
    /// `Registry::reconcile` reopens it.
    #[error("{request} payout failed ({transfer}) and rollback failed ({store})")]
    RollbackFailed {
        request: RequestId,
        transfer: EscrowError,
        store: StoreError,
    },

    /// The payout completed but recording it as released failed.
    #[error("{request} paid out but settlement was not recorded: {store}")]
    SettlementUnrecorded { request: RequestId, store: StoreError },

    /// A new request could not be recorded and its payment could not be refunded.
    ///
    /// The payment sits in escrow with no request referencing it.
    #[error("request by {requester} not recorded ({store}); refund of {amount} failed ({refund})")]
    RefundFailed {
        requester: Identity,
        amount: Amount,
        store: StoreError,
        refund: EscrowError,
    },

    /// The identity has no permission on the item.
    #[error("{identity} has no access to {item}")]
    AccessDenied { identity: Identity, item: ItemId },

    /// The encrypted-value store refused to reveal a payload.
    #[error("disclosure error: {0}")]
    Disclosure(#[from] DisclosureError),

    /// A stored request was not in the state its transition requires.
    #[error("ledger transition error: {0}")]
    Transition(TransitionError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Encoding or signature error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl From<ValidationError> for RegistryError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidProfile(reason) => RegistryError::InvalidProfile(reason),
            ValidationError::InvalidPrice { price, max } => {
                RegistryError::InvalidPrice { price, max }
            }
        }
    }
}

impl From<TransitionError> for RegistryError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyProcessed { request, state } => {
                RegistryError::AlreadyProcessed { request, state }
            }
            other => RegistryError::Transition(other),
        }
    }
}

/// Result type for Registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
