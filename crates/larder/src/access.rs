//! Access-Control Engine operations.
//!
//! Resolution follows a stage, commit, transfer discipline:
//!
//! 1. validate the request, the caller and the item
//! 2. commit the resolved request with escrow `Releasing`
//! 3. release escrow through the payment rail
//! 4. commit escrow `Released`, or on transfer failure commit the original
//!    `Pending` request back
//!
//! Permission only counts settled grants, so no reader observes a grant
//! before the owner has been paid, and a failed transfer leaves the request
//! exactly as it was.
//!
//! If the store also fails in step 4 the request is left `Releasing` and the
//! call reports [`RegistryError::RollbackFailed`] or
//! [`RegistryError::SettlementUnrecorded`]. Payouts are tagged with the
//! request id, so [`Registry::reconcile`] can later ask the rail which of
//! the two happened and commit the matching state.

use tracing::{info, warn};

use larder_core::{AccessRequest, Amount, Decision, Identity, ItemId, RequestId, TransitionError};
use larder_escrow::{EscrowHandle, PaymentRail};
use larder_store::{Changeset, Store};

use crate::error::{RegistryError, Result};
use crate::registry::{now_millis, Registry};

impl<S: Store, R: PaymentRail> Registry<S, R> {
    // ─────────────────────────────────────────────────────────────────────────
    // Access Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Request access to a private item, escrowing the full `payment`.
    ///
    /// Overpayment is accepted and held in full.
    pub async fn request_access(
        &self,
        item_id: ItemId,
        requester: &Identity,
        payment: Amount,
    ) -> Result<RequestId> {
        let _gate = self.gate().await;

        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or(RegistryError::ItemNotFound(item_id))?;

        if item.is_public {
            return Err(RegistryError::AlreadyPublic(item_id));
        }
        if item.is_owned_by(requester) {
            return Err(RegistryError::OwnerRequest(item_id));
        }
        if payment < item.price {
            return Err(RegistryError::InsufficientPayment {
                required: item.price,
                offered: payment,
            });
        }

        let id = self.store.next_request_id().await?;
        let handle = self.escrow.hold(requester, payment).await?;

        let request = AccessRequest::pending(id, item_id, *requester, payment, now_millis());
        if let Err(store) = self.store.apply(&Changeset::new().put_request(request)).await {
            warn!(
                request = %id,
                requester = %requester,
                error = %store,
                "request commit failed, refunding escrow"
            );
            return match self.escrow.refund(handle).await {
                Ok(_) => Err(store.into()),
                Err(refund) => {
                    warn!(request = %id, error = %refund, "refund after failed commit failed");
                    Err(RegistryError::RefundFailed {
                        requester: *requester,
                        amount: payment,
                        store,
                        refund,
                    })
                }
            };
        }

        info!(
            request = %id,
            item = %item_id,
            requester = %requester,
            amount = %payment,
            "access requested"
        );
        Ok(id)
    }

    /// Grant a pending request and pay its escrow to the item owner.
    pub async fn approve(&self, request_id: RequestId, caller: &Identity) -> Result<()> {
        self.resolve(request_id, caller, Decision::Grant).await
    }

    /// Deny a pending request and refund its escrow to the requester.
    pub async fn deny(&self, request_id: RequestId, caller: &Identity) -> Result<()> {
        self.resolve(request_id, caller, Decision::Deny).await
    }

    async fn resolve(&self, request_id: RequestId, caller: &Identity, decision: Decision) -> Result<()> {
        let _gate = self.gate().await;

        let pending = self
            .store
            .get_request(request_id)
            .await?
            .ok_or(RegistryError::RequestNotFound(request_id))?;

        if pending.state.is_terminal() {
            return Err(RegistryError::AlreadyProcessed {
                request: request_id,
                state: pending.state,
            });
        }

        let item = self
            .store
            .get_item(pending.item_id)
            .await?
            .ok_or(RegistryError::ItemNotFound(pending.item_id))?;

        if !item.is_owned_by(caller) {
            return Err(RegistryError::NotOwner {
                caller: *caller,
                item: item.id,
            });
        }

        let resolved = pending.resolve(decision, item.owner, now_millis())?;
        let recipient = resolved
            .escrow
            .recipient()
            .unwrap_or(pending.requester);

        self.commit(Changeset::new().put_request(resolved.clone()))
            .await?;

        if let Err(transfer) = self
            .escrow
            .release(EscrowHandle::for_request(&resolved), &recipient)
            .await
        {
            warn!(
                request = %request_id,
                decision = ?decision,
                error = %transfer,
                "settlement failed, rolling back resolution"
            );
            return match self.store.apply(&Changeset::new().put_request(pending)).await {
                Ok(()) => Err(RegistryError::TransferFailed(transfer)),
                Err(store) => {
                    warn!(request = %request_id, error = %store, "rollback commit failed");
                    Err(RegistryError::RollbackFailed {
                        request: request_id,
                        transfer,
                        store,
                    })
                }
            };
        }

        let settled = resolved.settle()?;
        if let Err(store) = self.store.apply(&Changeset::new().put_request(settled)).await {
            warn!(request = %request_id, error = %store, "paid out but settlement commit failed");
            return Err(RegistryError::SettlementUnrecorded {
                request: request_id,
                store,
            });
        }

        info!(
            request = %request_id,
            item = %item.id,
            decision = ?decision,
            recipient = %recipient,
            amount = %resolved.amount,
            "request resolved"
        );
        Ok(())
    }

    /// Bring an unsettled request in line with the payment rail.
    ///
    /// A request left `Releasing` by an interrupted resolution is settled if
    /// the rail recorded its payout, and reopened as `Pending` with its
    /// escrow held if it did not. Returns the request as committed.
    pub async fn reconcile(&self, request_id: RequestId) -> Result<AccessRequest> {
        let _gate = self.gate().await;

        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or(RegistryError::RequestNotFound(request_id))?;

        if !request.is_unsettled() {
            return Err(TransitionError::NotSettling {
                request: request_id,
            }
            .into());
        }

        let repaired = match self.escrow.payout_for(request_id).await? {
            Some(_) => request.settle()?,
            None => request.reopen()?,
        };
        self.commit(Changeset::new().put_request(repaired.clone()))
            .await?;

        info!(
            request = %request_id,
            state = ?repaired.state,
            escrow = ?repaired.escrow,
            "request reconciled"
        );
        Ok(repaired)
    }

    /// Check if `identity` may read the payload of `item_id`.
    ///
    /// True for the owner, for everyone once the item is public, and for a
    /// requester holding a settled grant. Never fails: unknown items and
    /// storage errors read as no access.
    pub async fn check_access(&self, identity: &Identity, item_id: ItemId) -> bool {
        match self.try_check_access(identity, item_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(item = %item_id, identity = %identity, error = %e, "access check failed");
                false
            }
        }
    }

    async fn try_check_access(&self, identity: &Identity, item_id: ItemId) -> Result<bool> {
        let Some(item) = self.store.get_item(item_id).await? else {
            return Ok(false);
        };
        if item.is_owned_by(identity) || item.is_public {
            return Ok(true);
        }
        Ok(self.store.has_granted(identity, item_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an access request.
    pub async fn request(&self, request_id: RequestId) -> Result<AccessRequest> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or(RegistryError::RequestNotFound(request_id))
    }

    /// All requests against an item, ordered by id.
    pub async fn requests_for_item(&self, item_id: ItemId) -> Result<Vec<AccessRequest>> {
        Ok(self.store.requests_for_item(item_id).await?)
    }

    /// Requests against an item still awaiting the owner's decision.
    pub async fn pending_requests_for_item(&self, item_id: ItemId) -> Result<Vec<AccessRequest>> {
        let mut requests = self.store.requests_for_item(item_id).await?;
        requests.retain(AccessRequest::is_pending);
        Ok(requests)
    }

    /// All requests made by `requester`, ordered by id.
    pub async fn requests_by_requester(&self, requester: &Identity) -> Result<Vec<AccessRequest>> {
        Ok(self.store.requests_by_requester(requester).await?)
    }

    /// Resolved requests whose payout never got committed as released.
    ///
    /// Each one is a candidate for [`Registry::reconcile`].
    pub async fn unsettled_requests(&self) -> Result<Vec<AccessRequest>> {
        Ok(self.store.unsettled_requests().await?)
    }
}
