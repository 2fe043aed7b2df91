//! Strong type definitions for Larder.
//!
//! All identifiers and amounts are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a published item.
///
/// Assigned monotonically by the record store, starting at 1. Never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    /// The first id handed out by an empty store.
    pub const FIRST: Self = Self(1);

    /// Create from a raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id that follows this one. Saturates at `u64::MAX`.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Identifier of an access request.
///
/// Assigned monotonically by the request ledger, starting at 1. Never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl RequestId {
    /// The first id handed out by an empty ledger.
    pub const FIRST: Self = Self(1);

    /// Create from a raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id that follows this one. Saturates at `u64::MAX`.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A non-negative value in the payment rail's smallest unit.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(pub u64);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Self(0);

    /// Largest representable value.
    pub const MAX: Self = Self(u64::MAX);

    /// Create from a raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Add, returning `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Subtract, returning `None` if `other` exceeds `self`.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Check if this is zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Big-endian encoding used by persistent stores.
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Decode from the big-endian storage encoding.
    pub const fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::iter::Sum for Amount {
    /// Saturates at [`Amount::MAX`].
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(0u64, |acc, a| acc.saturating_add(a.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_advance() {
        assert_eq!(ItemId::FIRST.next(), ItemId::new(2));
        assert_eq!(RequestId::FIRST.next().get(), 2);
    }

    #[test]
    fn test_ids_saturate_at_max() {
        assert_eq!(ItemId::new(u64::MAX).next(), ItemId::new(u64::MAX));
        assert_eq!(RequestId::new(u64::MAX).next(), RequestId::new(u64::MAX));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", ItemId::new(7)), "item#7");
        assert_eq!(format!("{}", RequestId::new(3)), "request#3");
        assert_eq!(format!("{:?}", ItemId::new(7)), "ItemId(7)");
    }

    #[test]
    fn test_amount_checked_arithmetic() {
        let ten = Amount::new(10);
        assert_eq!(ten.checked_add(Amount::new(5)), Some(Amount::new(15)));
        assert_eq!(ten.checked_sub(Amount::new(11)), None);
        assert_eq!(Amount::MAX.checked_add(Amount::new(1)), None);
    }

    #[test]
    fn test_amount_storage_encoding() {
        let amount = Amount::new(0x0102_0304_0506_0708);
        let bytes = amount.to_be_bytes();
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(Amount::from_be_bytes(bytes), amount);
    }

    #[test]
    fn test_amount_sum_saturates() {
        let total: Amount = vec![Amount::MAX, Amount::new(1)].into_iter().sum();
        assert_eq!(total, Amount::MAX);

        let total: Amount = vec![Amount::new(3), Amount::new(4)].into_iter().sum();
        assert_eq!(total, Amount::new(7));
    }
}
