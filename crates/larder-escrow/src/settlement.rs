//! Escrow settlement over a payment rail.
//!
//! Funds enter escrow once per request (`hold`) and leave it once
//! (`release`). [`EscrowHandle`] is not `Clone`, and `release` consumes it,
//! so a handle can only be spent once. After a failed release the caller
//! rebuilds the handle from the stored request with
//! [`EscrowHandle::for_request`].
//!
//! Releases of a request-bound handle are tagged with the request id, so
//! [`Escrow::payout_for`] can tell a paid request from an unpaid one.

use tracing::{info, warn};

use larder_core::{AccessRequest, Amount, Identity, RequestId};

use crate::error::Result;
use crate::rail::{PaymentRail, TransferReceipt};

/// A claim on value held in escrow.
#[derive(Debug, PartialEq, Eq)]
pub struct EscrowHandle {
    depositor: Identity,
    amount: Amount,
    request: Option<RequestId>,
}

impl EscrowHandle {
    /// Rebuild the handle for a stored request's escrowed payment.
    pub fn for_request(request: &AccessRequest) -> Self {
        Self {
            depositor: request.requester,
            amount: request.amount,
            request: Some(request.id),
        }
    }

    /// Who paid the funds in.
    pub fn depositor(&self) -> Identity {
        self.depositor
    }

    /// The full held amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// The stored request this handle pays for. `None` for a fresh hold.
    pub fn request(&self) -> Option<RequestId> {
        self.request
    }
}

/// Escrow settlement on top of a payment rail.
pub struct Escrow<R: PaymentRail> {
    rail: R,
}

impl<R: PaymentRail> Escrow<R> {
    pub fn new(rail: R) -> Self {
        Self { rail }
    }

    /// Access the underlying rail.
    pub fn rail(&self) -> &R {
        &self.rail
    }

    /// Collect `amount` from `from` into escrow.
    pub async fn hold(&self, from: &Identity, amount: Amount) -> Result<EscrowHandle> {
        self.rail.collect(from, amount).await?;
        info!(depositor = %from, %amount, "funds held in escrow");
        Ok(EscrowHandle {
            depositor: *from,
            amount,
            request: None,
        })
    }

    /// Pay the entire held amount to `recipient`.
    pub async fn release(
        &self,
        handle: EscrowHandle,
        recipient: &Identity,
    ) -> Result<TransferReceipt> {
        match self
            .rail
            .disburse(recipient, handle.amount, handle.request)
            .await
        {
            Ok(receipt) => {
                info!(
                    request = ?handle.request,
                    %recipient,
                    amount = %handle.amount,
                    "escrow released"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(
                    request = ?handle.request,
                    %recipient,
                    amount = %handle.amount,
                    error = %e,
                    "escrow release failed"
                );
                Err(e)
            }
        }
    }

    /// Return the held amount to whoever paid it in.
    pub async fn refund(&self, handle: EscrowHandle) -> Result<TransferReceipt> {
        let depositor = handle.depositor;
        self.release(handle, &depositor).await
    }

    /// The completed payout settling `request`, if the rail recorded one.
    pub async fn payout_for(&self, request: RequestId) -> Result<Option<TransferReceipt>> {
        self.rail.disbursement(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EscrowError;
    use crate::rail::memory::MemoryRail;
    use crate::rail::Direction;
    use larder_core::{Decision, ItemId};

    fn requester() -> Identity {
        Identity::from_bytes([0x0b; 32])
    }

    fn owner() -> Identity {
        Identity::from_bytes([0x0a; 32])
    }

    async fn funded_escrow() -> Escrow<MemoryRail> {
        let rail = MemoryRail::new();
        rail.fund(&requester(), Amount::new(100)).await.unwrap();
        Escrow::new(rail)
    }

    #[tokio::test]
    async fn test_hold_then_release_to_owner() {
        let escrow = funded_escrow().await;

        let handle = escrow.hold(&requester(), Amount::new(40)).await.unwrap();
        assert_eq!(handle.amount(), Amount::new(40));
        assert_eq!(escrow.rail().escrow_balance().await, Amount::new(40));

        assert_eq!(handle.request(), None);

        let receipt = escrow.release(handle, &owner()).await.unwrap();
        assert_eq!(receipt.direction, Direction::Disburse);
        assert_eq!(receipt.reference, None);
        assert_eq!(escrow.rail().balance_of(&owner()).await, Amount::new(40));
        assert_eq!(escrow.rail().balance_of(&requester()).await, Amount::new(60));
        assert_eq!(escrow.rail().escrow_balance().await, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_refund_returns_full_amount() {
        let escrow = funded_escrow().await;

        let handle = escrow.hold(&requester(), Amount::new(100)).await.unwrap();
        escrow.refund(handle).await.unwrap();

        assert_eq!(escrow.rail().balance_of(&requester()).await, Amount::new(100));
        assert_eq!(escrow.rail().escrow_balance().await, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_hold_without_funds_moves_nothing() {
        let escrow = funded_escrow().await;

        let err = escrow.hold(&owner(), Amount::new(1)).await.unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientFunds { .. }));
        assert_eq!(escrow.rail().escrow_balance().await, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_rebuilt_handle_after_failed_release() {
        let escrow = funded_escrow().await;
        escrow.hold(&requester(), Amount::new(25)).await.unwrap();

        let request = larder_core::AccessRequest::pending(
            RequestId::FIRST,
            ItemId::FIRST,
            requester(),
            Amount::new(25),
            0,
        )
        .resolve(Decision::Grant, owner(), 1)
        .unwrap();

        escrow.rail().fail_next_disbursements(1).await;
        let handle = EscrowHandle::for_request(&request);
        assert!(escrow.release(handle, &owner()).await.is_err());

        let handle = EscrowHandle::for_request(&request);
        assert_eq!(handle.request(), Some(RequestId::FIRST));
        assert_eq!(escrow.payout_for(RequestId::FIRST).await.unwrap(), None);

        escrow.release(handle, &owner()).await.unwrap();
        assert_eq!(escrow.rail().balance_of(&owner()).await, Amount::new(25));

        let payout = escrow.payout_for(RequestId::FIRST).await.unwrap().unwrap();
        assert_eq!(payout.party, owner());
        assert_eq!(payout.reference, Some(RequestId::FIRST));
    }
}
