//! Access requests and their state machine.
//!
//! ```text
//!             resolve(Grant)            settle()
//!   Pending ─────────────────▶ Granted ─────────▶ Granted
//!   escrow:Held                escrow:Releasing    escrow:Released
//!      │
//!      │      resolve(Deny)             settle()
//!      └─────────────────────▶ Denied  ─────────▶ Denied
//!                              escrow:Releasing    escrow:Released
//! ```
//!
//! `Granted` and `Denied` are terminal. The escrow leaves `Held` exactly once,
//! in the same transition that leaves `Pending`, towards exactly one
//! recipient: the item owner on grant, the requester on deny.

use serde::{Deserialize, Serialize};

use crate::crypto::Identity;
use crate::error::TransitionError;
use crate::types::{Amount, ItemId, RequestId};

/// Decision state of an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestState {
    /// Awaiting the owner's decision.
    Pending = 0,
    /// The owner approved the request.
    Granted = 1,
    /// The owner refused the request.
    Denied = 2,
}

impl RequestState {
    /// Convert to u8 for storage.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Pending),
            1 => Some(Self::Granted),
            2 => Some(Self::Denied),
            _ => None,
        }
    }

    /// Check if no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The owner's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Grant,
    Deny,
}

impl Decision {
    /// The terminal state this decision leads to.
    pub fn target_state(self) -> RequestState {
        match self {
            Decision::Grant => RequestState::Granted,
            Decision::Deny => RequestState::Denied,
        }
    }
}

/// Where the escrowed amount of a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    /// Held by the registry's escrow account.
    Held,

    /// Committed to a recipient; the transfer has not completed yet.
    Releasing {
        /// Who the funds are being released to.
        recipient: Identity,
    },

    /// Paid out to the recipient.
    Released {
        /// Who received the funds.
        recipient: Identity,
    },
}

impl EscrowState {
    /// Storage code: 0 = held, 1 = releasing, 2 = released.
    pub fn code(&self) -> u8 {
        match self {
            EscrowState::Held => 0,
            EscrowState::Releasing { .. } => 1,
            EscrowState::Released { .. } => 2,
        }
    }

    /// The recipient, once one has been chosen.
    pub fn recipient(&self) -> Option<Identity> {
        match self {
            EscrowState::Held => None,
            EscrowState::Releasing { recipient } | EscrowState::Released { recipient } => {
                Some(*recipient)
            }
        }
    }

    /// Rebuild from the storage code and recipient column.
    pub fn from_parts(code: u8, recipient: Option<Identity>) -> Option<Self> {
        match (code, recipient) {
            (0, None) => Some(EscrowState::Held),
            (1, Some(recipient)) => Some(EscrowState::Releasing { recipient }),
            (2, Some(recipient)) => Some(EscrowState::Released { recipient }),
            _ => None,
        }
    }

    /// Check if the funds have left escrow.
    pub fn is_released(&self) -> bool {
        matches!(self, EscrowState::Released { .. })
    }
}

/// A disclosure request against one item, with its escrowed payment.
///
/// Requests are never deleted; resolved requests remain as an audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Unique, monotonically assigned id.
    pub id: RequestId,

    /// The item access is requested for.
    pub item_id: ItemId,

    /// Who paid for the request.
    pub requester: Identity,

    /// The full escrowed payment. Immutable.
    pub amount: Amount,

    /// Decision state.
    pub state: RequestState,

    /// Escrow state.
    pub escrow: EscrowState,

    /// When the request was created (Unix ms).
    pub created_at: i64,

    /// When the owner resolved it (Unix ms).
    pub resolved_at: Option<i64>,
}

impl AccessRequest {
    /// Create a pending request holding `amount` in escrow.
    pub fn pending(
        id: RequestId,
        item_id: ItemId,
        requester: Identity,
        amount: Amount,
        now: i64,
    ) -> Self {
        Self {
            id,
            item_id,
            requester,
            amount,
            state: RequestState::Pending,
            escrow: EscrowState::Held,
            created_at: now,
            resolved_at: None,
        }
    }

    /// Apply the owner's decision.
    ///
    /// Returns the resolved request with its escrow committed to the
    /// recipient the decision implies. `self` is left untouched so the caller
    /// keeps the prior state for rollback.
    pub fn resolve(
        &self,
        decision: Decision,
        owner: Identity,
        now: i64,
    ) -> Result<AccessRequest, TransitionError> {
        if self.state.is_terminal() || self.escrow != EscrowState::Held {
            return Err(TransitionError::AlreadyProcessed {
                request: self.id,
                state: self.state,
            });
        }

        let recipient = match decision {
            Decision::Grant => owner,
            Decision::Deny => self.requester,
        };

        Ok(AccessRequest {
            state: decision.target_state(),
            escrow: EscrowState::Releasing { recipient },
            resolved_at: Some(now),
            ..self.clone()
        })
    }

    /// Record that the escrow transfer completed.
    pub fn settle(&self) -> Result<AccessRequest, TransitionError> {
        match self.escrow {
            EscrowState::Releasing { recipient } => Ok(AccessRequest {
                escrow: EscrowState::Released { recipient },
                ..self.clone()
            }),
            _ => Err(TransitionError::NotSettling { request: self.id }),
        }
    }

    /// Undo an unpaid resolution, returning the request to `Pending`.
    ///
    /// Only valid while the escrow is `Releasing`: once `Released` the
    /// funds have moved and the decision stands.
    pub fn reopen(&self) -> Result<AccessRequest, TransitionError> {
        match self.escrow {
            EscrowState::Releasing { .. } => Ok(AccessRequest {
                state: RequestState::Pending,
                escrow: EscrowState::Held,
                resolved_at: None,
                ..self.clone()
            }),
            _ => Err(TransitionError::NotSettling { request: self.id }),
        }
    }

    /// Check if this request confers permission on its requester.
    ///
    /// A grant counts only once the owner has been paid.
    pub fn is_granted(&self) -> bool {
        self.state == RequestState::Granted && self.escrow.is_released()
    }

    /// Check if the request awaits a decision.
    pub fn is_pending(&self) -> bool {
        self.state == RequestState::Pending
    }

    /// Check if the request was resolved but its payout did not complete.
    pub fn is_unsettled(&self) -> bool {
        matches!(self.escrow, EscrowState::Releasing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Identity {
        Identity::from_bytes([0x0a; 32])
    }

    fn requester() -> Identity {
        Identity::from_bytes([0x0b; 32])
    }

    fn pending() -> AccessRequest {
        AccessRequest::pending(RequestId::FIRST, ItemId::FIRST, requester(), Amount::new(10), 1)
    }

    #[test]
    fn test_grant_releases_to_owner() {
        let resolved = pending().resolve(Decision::Grant, owner(), 5).unwrap();

        assert_eq!(resolved.state, RequestState::Granted);
        assert_eq!(resolved.escrow, EscrowState::Releasing { recipient: owner() });
        assert_eq!(resolved.resolved_at, Some(5));
        assert!(!resolved.is_granted());

        let settled = resolved.settle().unwrap();
        assert!(settled.is_granted());
        assert_eq!(settled.amount, Amount::new(10));
    }

    #[test]
    fn test_deny_refunds_requester() {
        let resolved = pending().resolve(Decision::Deny, owner(), 5).unwrap();

        assert_eq!(resolved.state, RequestState::Denied);
        assert_eq!(resolved.escrow.recipient(), Some(requester()));

        let settled = resolved.settle().unwrap();
        assert!(!settled.is_granted());
        assert!(settled.escrow.is_released());
    }

    #[test]
    fn test_terminal_states_reject_resolution() {
        let granted = pending().resolve(Decision::Grant, owner(), 5).unwrap();

        for decision in [Decision::Grant, Decision::Deny] {
            let err = granted.resolve(decision, owner(), 6).unwrap_err();
            assert_eq!(
                err,
                TransitionError::AlreadyProcessed {
                    request: RequestId::FIRST,
                    state: RequestState::Granted,
                }
            );
        }

        let settled = granted.settle().unwrap();
        assert!(settled.resolve(Decision::Deny, owner(), 7).is_err());
    }

    #[test]
    fn test_settle_requires_releasing() {
        assert!(matches!(
            pending().settle(),
            Err(TransitionError::NotSettling { .. })
        ));

        let settled = pending()
            .resolve(Decision::Deny, owner(), 5)
            .unwrap()
            .settle()
            .unwrap();
        assert!(settled.settle().is_err());
    }

    #[test]
    fn test_reopen_restores_pending() {
        let resolved = pending().resolve(Decision::Grant, owner(), 5).unwrap();

        let reopened = resolved.reopen().unwrap();
        assert_eq!(reopened, pending());
        assert!(reopened.resolve(Decision::Deny, owner(), 6).is_ok());

        assert!(pending().reopen().is_err());
        assert!(matches!(
            resolved.settle().unwrap().reopen(),
            Err(TransitionError::NotSettling { .. })
        ));
    }

    #[test]
    fn test_state_codes_roundtrip() {
        for state in [RequestState::Pending, RequestState::Granted, RequestState::Denied] {
            assert_eq!(RequestState::from_u8(state.to_u8()), Some(state));
        }
        assert_eq!(RequestState::from_u8(9), None);

        let releasing = EscrowState::Releasing { recipient: owner() };
        assert_eq!(
            EscrowState::from_parts(releasing.code(), releasing.recipient()),
            Some(releasing)
        );
        assert_eq!(EscrowState::from_parts(0, Some(owner())), None);
    }
}
