//! Test fixtures and helpers.
//!
//! Common setup code for integration and property tests.

use std::sync::Arc;

use rand::RngCore;

use larder::{Registry, RegistryConfig, RegistryError};
use larder_core::{Amount, EscrowState, Identity, ItemId, Keypair, ProducerProfile, RequestId};
use larder_escrow::MemoryRail;
use larder_store::{MemoryStore, Store};

use crate::flaky::FlakyStore;
use crate::generators::Op;

/// Balance every fixture party starts with.
pub const DEFAULT_FUNDING: Amount = Amount::new(1_000);

/// A registry with one registered chef and a set of funded diners.
pub struct RegistryFixture<S: Store = MemoryStore> {
    pub registry: Registry<S, Arc<MemoryRail>>,
    pub rail: Arc<MemoryRail>,
    pub chef: Keypair,
    pub diners: Vec<Keypair>,
    /// Total value funded into the rail at setup.
    pub funded: Amount,
}

impl RegistryFixture<MemoryStore> {
    /// Create a fixture over an in-memory store.
    pub async fn new(diners: usize) -> Self {
        Self::with_store(MemoryStore::new(), diners, RegistryConfig::default()).await
    }
}

impl RegistryFixture<FlakyStore> {
    /// Create a fixture over an in-memory store with fault injection.
    ///
    /// No faults are armed until the test arms them through
    /// `fixture.registry.store()`.
    pub async fn flaky(diners: usize) -> Self {
        let store = FlakyStore::new(MemoryStore::new());
        Self::with_store(store, diners, RegistryConfig::default()).await
    }
}

impl<S: Store> RegistryFixture<S> {
    /// Create a fixture over `store`, registering the chef and funding every
    /// diner with [`DEFAULT_FUNDING`].
    pub async fn with_store(store: S, diners: usize, config: RegistryConfig) -> Self {
        let rail = Arc::new(MemoryRail::new());
        let registry = Registry::new(
            Keypair::from_seed(&[0xff; 32]),
            store,
            Arc::clone(&rail),
            config,
        );

        let mut parties = multi_party_identities(diners + 1);
        let chef = parties.remove(0);
        registry
            .register(&chef.identity(), &ProducerProfile::new("Fixture Chef", "house specials"))
            .await
            .unwrap();

        let mut funded = Amount::ZERO;
        for diner in &parties {
            rail.fund(&diner.identity(), DEFAULT_FUNDING).await.unwrap();
            funded = funded.checked_add(DEFAULT_FUNDING).unwrap();
        }

        Self {
            registry,
            rail,
            chef,
            diners: parties,
            funded,
        }
    }

    /// The chef's identity.
    pub fn chef_id(&self) -> Identity {
        self.chef.identity()
    }

    /// The identity of diner `i`.
    pub fn diner(&self, i: usize) -> Identity {
        self.diners[i % self.diners.len()].identity()
    }

    /// Publish a private item priced at `price`.
    pub async fn publish_private(&self, price: u64) -> ItemId {
        self.registry
            .publish(&self.chef_id(), Amount::new(price), false)
            .await
            .unwrap()
    }

    /// Sum of every balance on the rail, escrow included.
    pub async fn total_supply(&self) -> Amount {
        self.rail.total_supply().await
    }

    /// Execute a sequence of operations, recording what happened.
    ///
    /// Operation failures are expected and recorded; they never abort the run.
    pub async fn run(&self, ops: &[Op]) -> RunLog {
        let mut log = RunLog::default();

        for op in ops {
            let outcome = self.apply(op, &log).await;
            match outcome {
                Ok(Applied::Published(id)) => log.items.push(id),
                Ok(Applied::Requested(id)) => log.requests.push(id),
                Ok(Applied::Resolved(id)) => log.resolved.push(id),
                Ok(Applied::Other) => {}
                Err(e) => log.errors.push(e.to_string()),
            }
        }

        log
    }

    async fn apply(&self, op: &Op, log: &RunLog) -> Result<Applied, RegistryError> {
        let chef = self.chef_id();
        match *op {
            Op::Publish { price, public } => {
                let id = self
                    .registry
                    .publish(&chef, Amount::new(price), public)
                    .await?;
                Ok(Applied::Published(id))
            }
            Op::Request {
                item,
                diner,
                payment,
            } => {
                let Some(&item) = pick(&log.items, item) else {
                    return Ok(Applied::Other);
                };
                let id = self
                    .registry
                    .request_access(item, &self.diner(diner), Amount::new(payment))
                    .await?;
                Ok(Applied::Requested(id))
            }
            Op::Approve { request } => {
                let Some(&id) = pick(&log.requests, request) else {
                    return Ok(Applied::Other);
                };
                self.registry.approve(id, &chef).await?;
                Ok(Applied::Resolved(id))
            }
            Op::Deny { request } => {
                let Some(&id) = pick(&log.requests, request) else {
                    return Ok(Applied::Other);
                };
                self.registry.deny(id, &chef).await?;
                Ok(Applied::Resolved(id))
            }
            Op::ForeignApprove { request, diner } => {
                let Some(&id) = pick(&log.requests, request) else {
                    return Ok(Applied::Other);
                };
                self.registry.approve(id, &self.diner(diner)).await?;
                Ok(Applied::Resolved(id))
            }
            Op::SetPublic { item } => {
                let Some(&item) = pick(&log.items, item) else {
                    return Ok(Applied::Other);
                };
                self.registry.set_public(item, &chef).await?;
                Ok(Applied::Other)
            }
            Op::SetPrice { item, price } => {
                let Some(&item) = pick(&log.items, item) else {
                    return Ok(Applied::Other);
                };
                self.registry
                    .set_price(item, &chef, Amount::new(price))
                    .await?;
                Ok(Applied::Other)
            }
            Op::FailNextDisbursement => {
                self.rail.fail_next_disbursements(1).await;
                Ok(Applied::Other)
            }
        }
    }

    /// Sum of amounts whose escrow is still held.
    pub async fn held_in_requests(&self, log: &RunLog) -> Amount {
        let mut held = Amount::ZERO;
        for id in &log.requests {
            let request = self.registry.request(*id).await.unwrap();
            if request.escrow == EscrowState::Held {
                held = held.checked_add(request.amount).unwrap();
            }
        }
        held
    }
}

enum Applied {
    Published(ItemId),
    Requested(RequestId),
    Resolved(RequestId),
    Other,
}

fn pick<T>(items: &[T], index: usize) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        items.get(index % items.len())
    }
}

/// What a [`RegistryFixture::run`] did.
#[derive(Debug, Default, Clone)]
pub struct RunLog {
    /// Ids of items published, in order.
    pub items: Vec<ItemId>,
    /// Ids of requests created, in order.
    pub requests: Vec<RequestId>,
    /// Requests successfully resolved, in order. Each appears at most once.
    pub resolved: Vec<RequestId>,
    /// Rendered errors of failed operations.
    pub errors: Vec<String>,
}

/// Create deterministic keypairs for multi-party tests.
pub fn multi_party_identities(count: usize) -> Vec<Keypair> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = (i >> 8) as u8;
            seed[31] = 0x1a;
            Keypair::from_seed(&seed)
        })
        .collect()
}

/// Create a fresh random identity.
pub fn random_identity() -> Identity {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    Keypair::from_seed(&seed).identity()
}
