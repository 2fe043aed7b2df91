//! Error types for Larder Core.

use thiserror::Error;

use crate::request::RequestState;
use crate::types::{Amount, RequestId};

/// Core errors from encoding and signature checks.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("invalid price {price}: maximum is {max}")]
    InvalidPrice { price: Amount, max: Amount },
}

/// Rejected state machine transitions on an access request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{request} already processed: state is {state:?}")]
    AlreadyProcessed {
        request: RequestId,
        state: RequestState,
    },

    #[error("{request} escrow is not awaiting settlement")]
    NotSettling { request: RequestId },
}

/// Capability verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("capability signature does not verify against issuer")]
    BadSignature,

    #[error("capability issued by an unexpected authority")]
    WrongIssuer,

    #[error("capability expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },
}
