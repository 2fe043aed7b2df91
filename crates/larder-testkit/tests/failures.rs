//! Double faults: the payment rail and the store failing in the same call.

use larder::RegistryError;
use larder_core::{Amount, EscrowState, RequestState};
use larder_escrow::{Direction, EscrowError};
use larder_testkit::RegistryFixture;

#[tokio::test]
async fn failed_payout_with_failed_rollback_is_reported_and_reopened() {
    let fixture = RegistryFixture::flaky(1).await;
    let (chef, diner) = (fixture.chef_id(), fixture.diner(0));
    let item = fixture.publish_private(10).await;
    let r = fixture
        .registry
        .request_access(item, &diner, Amount::new(10))
        .await
        .unwrap();

    // The releasing commit goes through, the rollback does not
    fixture.rail.fail_next_disbursements(1).await;
    fixture.registry.store().fail_applies_after(1, 1);

    let err = fixture.registry.approve(r, &chef).await.unwrap_err();
    assert!(
        matches!(
            err,
            RegistryError::RollbackFailed {
                request,
                transfer: EscrowError::TransferFailed(_),
                ..
            } if request == r
        ),
        "approve returned {err:?}"
    );

    let stuck = fixture.registry.request(r).await.unwrap();
    assert_eq!(stuck.state, RequestState::Granted);
    assert!(stuck.is_unsettled());
    assert!(!fixture.registry.check_access(&diner, item).await);
    assert_eq!(fixture.rail.escrow_balance().await, Amount::new(10));
    assert_eq!(fixture.rail.balance_of(&chef).await, Amount::ZERO);

    let reopened = fixture.registry.reconcile(r).await.unwrap();
    assert_eq!(reopened.state, RequestState::Pending);
    assert_eq!(reopened.escrow, EscrowState::Held);
    assert_eq!(reopened.resolved_at, None);
    assert!(fixture.registry.unsettled_requests().await.unwrap().is_empty());

    // Back to an ordinary pending request
    fixture.registry.approve(r, &chef).await.unwrap();
    assert!(fixture.registry.check_access(&diner, item).await);
    assert_eq!(fixture.rail.balance_of(&chef).await, Amount::new(10));
    assert_eq!(fixture.rail.escrow_balance().await, Amount::ZERO);
}

#[tokio::test]
async fn paid_out_but_unrecorded_settlement_is_settled_on_reconcile() {
    let fixture = RegistryFixture::flaky(1).await;
    let (chef, diner) = (fixture.chef_id(), fixture.diner(0));
    let item = fixture.publish_private(10).await;
    let r = fixture
        .registry
        .request_access(item, &diner, Amount::new(10))
        .await
        .unwrap();

    fixture.registry.store().fail_applies_after(1, 1);

    assert!(matches!(
        fixture.registry.approve(r, &chef).await,
        Err(RegistryError::SettlementUnrecorded { request, .. }) if request == r
    ));
    assert!(fixture.registry.request(r).await.unwrap().is_unsettled());
    assert!(!fixture.registry.check_access(&diner, item).await);
    assert_eq!(fixture.rail.balance_of(&chef).await, Amount::new(10));

    let settled = fixture.registry.reconcile(r).await.unwrap();
    assert_eq!(settled.escrow, EscrowState::Released { recipient: chef });
    assert!(fixture.registry.check_access(&diner, item).await);

    // Reconciling never pays out a second time
    let payouts = fixture
        .rail
        .transfers()
        .await
        .into_iter()
        .filter(|t| t.direction == Direction::Disburse)
        .count();
    assert_eq!(payouts, 1);
    assert!(matches!(
        fixture.registry.deny(r, &chef).await,
        Err(RegistryError::AlreadyProcessed { .. })
    ));
}

#[tokio::test]
async fn unrecorded_request_with_failed_refund_is_reported() {
    let fixture = RegistryFixture::flaky(1).await;
    let diner = fixture.diner(0);
    let item = fixture.publish_private(10).await;

    fixture.rail.fail_next_disbursements(1).await;
    fixture.registry.store().fail_applies_after(0, 1);

    let err = fixture
        .registry
        .request_access(item, &diner, Amount::new(12))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            RegistryError::RefundFailed { requester, amount, .. }
                if requester == diner && amount == Amount::new(12)
        ),
        "request_access returned {err:?}"
    );

    assert!(fixture.registry.requests_by_requester(&diner).await.unwrap().is_empty());
    assert_eq!(fixture.rail.escrow_balance().await, Amount::new(12));
}

#[tokio::test]
async fn unrecorded_request_is_refunded() {
    let fixture = RegistryFixture::flaky(1).await;
    let diner = fixture.diner(0);
    let item = fixture.publish_private(10).await;
    let before = fixture.rail.balance_of(&diner).await;

    fixture.registry.store().fail_applies_after(0, 1);

    assert!(matches!(
        fixture
            .registry
            .request_access(item, &diner, Amount::new(10))
            .await,
        Err(RegistryError::Store(_))
    ));
    assert_eq!(fixture.rail.balance_of(&diner).await, before);
    assert_eq!(fixture.rail.escrow_balance().await, Amount::ZERO);

    // The refund settles no request
    let refund = fixture.rail.transfers().await.pop().unwrap();
    assert_eq!(refund.direction, Direction::Disburse);
    assert_eq!(refund.reference, None);
}

#[tokio::test]
async fn reconcile_only_touches_unsettled_requests() {
    let fixture = RegistryFixture::flaky(1).await;
    let (chef, diner) = (fixture.chef_id(), fixture.diner(0));
    let item = fixture.publish_private(10).await;
    let r = fixture
        .registry
        .request_access(item, &diner, Amount::new(10))
        .await
        .unwrap();

    assert!(matches!(
        fixture.registry.reconcile(r).await,
        Err(RegistryError::Transition(_))
    ));
    assert!(matches!(
        fixture.registry.reconcile(r.next()).await,
        Err(RegistryError::RequestNotFound(_))
    ));

    fixture.registry.deny(r, &chef).await.unwrap();
    let settled = fixture.registry.request(r).await.unwrap();
    assert!(fixture.registry.reconcile(r).await.is_err());
    assert_eq!(fixture.registry.request(r).await.unwrap(), settled);
}

#[tokio::test]
async fn lookups_fail_closed_when_store_is_unreadable() {
    let fixture = RegistryFixture::flaky(1).await;
    let chef = fixture.chef_id();
    let item = fixture.publish_private(10).await;

    fixture.registry.store().fail_reads(true);
    assert!(!fixture.registry.is_registered(&chef).await);
    assert!(!fixture.registry.check_access(&chef, item).await);

    fixture.registry.store().fail_reads(false);
    assert!(fixture.registry.is_registered(&chef).await);
    assert!(fixture.registry.check_access(&chef, item).await);
}
