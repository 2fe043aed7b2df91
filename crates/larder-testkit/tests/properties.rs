//! Ledger properties under random operation sequences.

use std::collections::HashSet;

use proptest::prelude::*;

use larder::{RegistryConfig, RegistryError};
use larder_core::{Amount, EscrowState, RequestState};
use larder_escrow::Direction;
use larder_store::SqliteStore;
use larder_testkit::generators::{ops, valid_profile, invalid_profile};
use larder_testkit::{random_identity, RegistryFixture};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn supply_is_conserved(ops in ops(40)) {
        runtime().block_on(async {
            let fixture = RegistryFixture::new(3).await;
            fixture.run(&ops).await;

            assert_eq!(fixture.total_supply().await, fixture.funded);
        });
    }

    #[test]
    fn escrow_matches_held_requests(ops in ops(40)) {
        runtime().block_on(async {
            let fixture = RegistryFixture::new(3).await;
            let log = fixture.run(&ops).await;

            assert_eq!(
                fixture.rail.escrow_balance().await,
                fixture.held_in_requests(&log).await
            );
            assert!(fixture.registry.unsettled_requests().await.unwrap().is_empty());
        });
    }

    #[test]
    fn every_resolution_pays_out_once(ops in ops(40)) {
        runtime().block_on(async {
            let fixture = RegistryFixture::new(3).await;
            let log = fixture.run(&ops).await;

            let unique: HashSet<_> = log.resolved.iter().collect();
            assert_eq!(unique.len(), log.resolved.len());

            let disbursed = fixture
                .rail
                .transfers()
                .await
                .into_iter()
                .filter(|t| t.direction == Direction::Disburse)
                .count();
            assert_eq!(disbursed, log.resolved.len());

            for id in &log.resolved {
                let request = fixture.registry.request(*id).await.unwrap();
                assert!(request.escrow.is_released());
                assert!(request.state.is_terminal());
            }
        });
    }

    #[test]
    fn resolved_requests_stay_resolved(ops in ops(30)) {
        runtime().block_on(async {
            let fixture = RegistryFixture::new(2).await;
            let log = fixture.run(&ops).await;
            let chef = fixture.chef_id();

            for id in &log.resolved {
                let before = fixture.registry.request(*id).await.unwrap();
                let again = fixture.registry.deny(*id, &chef).await;
                assert!(
                    matches!(again, Err(RegistryError::AlreadyProcessed { state, .. }) if state == before.state),
                    "second resolution of {id} returned {again:?}"
                );
                assert_eq!(fixture.registry.request(*id).await.unwrap(), before);
            }
        });
    }

    #[test]
    fn permission_follows_settled_grants(ops in ops(40)) {
        runtime().block_on(async {
            let fixture = RegistryFixture::new(3).await;
            let log = fixture.run(&ops).await;
            let outsider = random_identity();

            for item_id in &log.items {
                let item = fixture.registry.get(*item_id).await.unwrap();
                assert!(fixture.registry.check_access(&fixture.chef_id(), *item_id).await);
                assert_eq!(
                    fixture.registry.check_access(&outsider, *item_id).await,
                    item.is_public
                );

                for diner in &fixture.diners {
                    let diner = diner.identity();
                    let granted = fixture
                        .registry
                        .requests_by_requester(&diner)
                        .await
                        .unwrap()
                        .iter()
                        .any(|r| r.item_id == *item_id
                            && r.state == RequestState::Granted
                            && matches!(r.escrow, EscrowState::Released { .. }));
                    assert_eq!(
                        fixture.registry.check_access(&diner, *item_id).await,
                        item.is_public || granted
                    );
                }
            }
        });
    }

    #[test]
    fn public_items_never_revert(ops in ops(40)) {
        runtime().block_on(async {
            let fixture = RegistryFixture::new(2).await;
            let log = fixture.run(&ops).await;
            let chef = fixture.chef_id();

            for item_id in &log.items {
                fixture.registry.set_public(*item_id, &chef).await.unwrap();
                fixture.registry.set_price(*item_id, &chef, Amount::new(7)).await.unwrap();
                fixture.registry.set_public(*item_id, &chef).await.unwrap();
                assert!(fixture.registry.get(*item_id).await.unwrap().is_public);
                assert!(matches!(
                    fixture.registry.request_access(*item_id, &fixture.diner(0), Amount::new(7)).await,
                    Err(RegistryError::AlreadyPublic(_))
                ));
            }
        });
    }

    #[test]
    fn registration_accepts_only_valid_profiles(
        good in valid_profile(),
        bad in invalid_profile(),
    ) {
        runtime().block_on(async {
            let fixture = RegistryFixture::new(1).await;
            let applicant = random_identity();

            assert!(matches!(
                fixture.registry.register(&applicant, &bad).await,
                Err(RegistryError::InvalidProfile(_))
            ));
            assert!(!fixture.registry.is_registered(&applicant).await);

            fixture.registry.register(&applicant, &good).await.unwrap();
            assert!(fixture.registry.is_registered(&applicant).await);
        });
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn sqlite_ledger_matches_rail(ops in ops(24)) {
        runtime().block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = SqliteStore::open(dir.path().join("larder.db")).unwrap();
            let fixture = RegistryFixture::with_store(store, 3, RegistryConfig::default()).await;
            let log = fixture.run(&ops).await;

            assert_eq!(fixture.total_supply().await, fixture.funded);
            assert_eq!(
                fixture.rail.escrow_balance().await,
                fixture.held_in_requests(&log).await
            );
        });
    }
}
