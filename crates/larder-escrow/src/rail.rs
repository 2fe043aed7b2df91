//! Payment rail abstraction.
//!
//! The rail is the external collaborator that actually moves value. The
//! registry sees whether a transfer succeeded and can ask the rail later
//! whether a request's payout ever went through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use larder_core::{Amount, Identity, RequestId};

use crate::error::Result;

/// Which way value moved relative to the escrow account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// From a party into escrow.
    Collect,
    /// From escrow to a party.
    Disburse,
}

/// Confirmation of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub party: Identity,
    pub amount: Amount,
    pub direction: Direction,
    /// The request a disbursement settles, if any.
    pub reference: Option<RequestId>,
}

/// A rail able to move value in and out of the registry's escrow account.
///
/// Implementations must not call back into the registry: the registry holds
/// its mutation gate across these calls.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    /// Move `amount` from `from` into escrow.
    async fn collect(&self, from: &Identity, amount: Amount) -> Result<TransferReceipt>;

    /// Move `amount` from escrow to `to`, tagged with the request it settles.
    async fn disburse(
        &self,
        to: &Identity,
        amount: Amount,
        reference: Option<RequestId>,
    ) -> Result<TransferReceipt>;

    /// The completed disbursement tagged with `reference`, if one exists.
    async fn disbursement(&self, reference: RequestId) -> Result<Option<TransferReceipt>>;
}

#[async_trait]
impl<R: PaymentRail + ?Sized> PaymentRail for Arc<R> {
    async fn collect(&self, from: &Identity, amount: Amount) -> Result<TransferReceipt> {
        (**self).collect(from, amount).await
    }

    async fn disburse(
        &self,
        to: &Identity,
        amount: Amount,
        reference: Option<RequestId>,
    ) -> Result<TransferReceipt> {
        (**self).disburse(to, amount, reference).await
    }

    async fn disbursement(&self, reference: RequestId) -> Result<Option<TransferReceipt>> {
        (**self).disbursement(reference).await
    }
}

/// A simple in-memory rail for testing.
///
/// Keeps a balance per party plus the escrow account, and can be told to
/// fail upcoming transfers.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    use crate::error::EscrowError;

    #[derive(Default)]
    struct RailState {
        balances: HashMap<Identity, Amount>,
        escrow: Amount,
        fail_collections: u32,
        fail_disbursements: u32,
        transfers: Vec<TransferReceipt>,
    }

    /// In-memory payment rail.
    #[derive(Default)]
    pub struct MemoryRail {
        state: RwLock<RailState>,
    }

    impl MemoryRail {
        /// Create a rail with no balances.
        pub fn new() -> Self {
            Self::default()
        }

        /// Credit `party` with `amount` from outside the system.
        pub async fn fund(&self, party: &Identity, amount: Amount) -> Result<Amount> {
            let mut state = self.state.write().await;
            let balance = state.balances.entry(*party).or_insert(Amount::ZERO);
            *balance = balance.checked_add(amount).ok_or(EscrowError::Overflow)?;
            Ok(*balance)
        }

        /// Current balance of `party`.
        pub async fn balance_of(&self, party: &Identity) -> Amount {
            let state = self.state.read().await;
            state.balances.get(party).copied().unwrap_or(Amount::ZERO)
        }

        /// Value currently held in escrow.
        pub async fn escrow_balance(&self) -> Amount {
            self.state.read().await.escrow
        }

        /// Sum of all party balances plus escrow.
        pub async fn total_supply(&self) -> Amount {
            let state = self.state.read().await;
            state
                .balances
                .values()
                .copied()
                .sum::<Amount>()
                .checked_add(state.escrow)
                .unwrap_or(Amount::MAX)
        }

        /// Make the next `n` disbursements fail.
        pub async fn fail_next_disbursements(&self, n: u32) {
            self.state.write().await.fail_disbursements = n;
        }

        /// Make the next `n` collections fail.
        pub async fn fail_next_collections(&self, n: u32) {
            self.state.write().await.fail_collections = n;
        }

        /// Every completed transfer, in order.
        pub async fn transfers(&self) -> Vec<TransferReceipt> {
            self.state.read().await.transfers.clone()
        }
    }

    #[async_trait]
    impl PaymentRail for MemoryRail {
        async fn collect(&self, from: &Identity, amount: Amount) -> Result<TransferReceipt> {
            let mut state = self.state.write().await;

            if state.fail_collections > 0 {
                state.fail_collections -= 1;
                return Err(EscrowError::TransferFailed("collection rejected by rail".into()));
            }

            let available = state.balances.get(from).copied().unwrap_or(Amount::ZERO);
            let remaining = available
                .checked_sub(amount)
                .ok_or(EscrowError::InsufficientFunds {
                    party: *from,
                    required: amount,
                    available,
                })?;
            let escrow = state.escrow.checked_add(amount).ok_or(EscrowError::Overflow)?;

            state.balances.insert(*from, remaining);
            state.escrow = escrow;

            let receipt = TransferReceipt {
                party: *from,
                amount,
                direction: Direction::Collect,
                reference: None,
            };
            state.transfers.push(receipt);
            Ok(receipt)
        }

        async fn disburse(
            &self,
            to: &Identity,
            amount: Amount,
            reference: Option<RequestId>,
        ) -> Result<TransferReceipt> {
            let mut state = self.state.write().await;

            if state.fail_disbursements > 0 {
                state.fail_disbursements -= 1;
                return Err(EscrowError::TransferFailed("disbursement rejected by rail".into()));
            }

            let escrow = state
                .escrow
                .checked_sub(amount)
                .ok_or_else(|| EscrowError::TransferFailed("escrow account underfunded".into()))?;
            let current = state.balances.get(to).copied().unwrap_or(Amount::ZERO);
            let credited = current.checked_add(amount).ok_or(EscrowError::Overflow)?;

            state.escrow = escrow;
            state.balances.insert(*to, credited);

            let receipt = TransferReceipt {
                party: *to,
                amount,
                direction: Direction::Disburse,
                reference,
            };
            state.transfers.push(receipt);
            Ok(receipt)
        }

        async fn disbursement(&self, reference: RequestId) -> Result<Option<TransferReceipt>> {
            let state = self.state.read().await;
            Ok(state
                .transfers
                .iter()
                .rev()
                .find(|t| t.direction == Direction::Disburse && t.reference == Some(reference))
                .copied())
        }
    }
}
