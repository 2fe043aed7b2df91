//! Disclosure capabilities.
//!
//! A capability is the registry's signed statement that `holder` may read the
//! encrypted payload of `item_id` until `expires_at`. The encrypted-value
//! store trusts the registry's identity and checks capabilities without
//! consulting the record store.
//!
//! Signature message: `b"larder-capability-v0:" || canonical_cbor(body)`

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_capability_bytes;
use crate::crypto::{Identity, Keypair, Signature};
use crate::error::{CapabilityError, CoreError};
use crate::types::ItemId;

/// Domain separator for capability signatures.
pub const CAPABILITY_DOMAIN: &[u8] = b"larder-capability-v0:";

/// The signed part of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityBody {
    /// The item whose payload may be read.
    pub item_id: ItemId,

    /// Who may read it.
    pub holder: Identity,

    /// The issuing registry.
    pub issuer: Identity,

    /// Issue time (Unix ms).
    pub issued_at: i64,

    /// Expiry time (Unix ms). The capability is invalid at and after this instant.
    pub expires_at: i64,
}

impl CapabilityBody {
    /// Bytes covered by the signature.
    pub fn signing_message(&self) -> Result<Vec<u8>, CoreError> {
        let body = canonical_capability_bytes(self)?;
        let mut msg = Vec::with_capacity(CAPABILITY_DOMAIN.len() + body.len());
        msg.extend_from_slice(CAPABILITY_DOMAIN);
        msg.extend_from_slice(&body);
        Ok(msg)
    }
}

/// A signed disclosure capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureCapability {
    pub body: CapabilityBody,
    pub signature: Signature,
}

impl DisclosureCapability {
    /// Issue a capability signed by `issuer`.
    pub fn issue(
        issuer: &Keypair,
        item_id: ItemId,
        holder: Identity,
        now: i64,
        ttl_ms: i64,
    ) -> Result<Self, CoreError> {
        let body = CapabilityBody {
            item_id,
            holder,
            issuer: issuer.identity(),
            issued_at: now,
            expires_at: now.saturating_add(ttl_ms),
        };
        let signature = issuer.sign(&body.signing_message()?);
        Ok(Self { body, signature })
    }

    /// Verify issuer, signature and expiry.
    pub fn verify(&self, expected_issuer: &Identity, now: i64) -> Result<(), CapabilityError> {
        if &self.body.issuer != expected_issuer {
            return Err(CapabilityError::WrongIssuer);
        }

        let msg = self
            .body
            .signing_message()
            .map_err(|_| CapabilityError::BadSignature)?;
        expected_issuer
            .verify(&msg, &self.signature)
            .map_err(|_| CapabilityError::BadSignature)?;

        if now >= self.body.expires_at {
            return Err(CapabilityError::Expired {
                expires_at: self.body.expires_at,
                now,
            });
        }

        Ok(())
    }

    pub fn item_id(&self) -> ItemId {
        self.body.item_id
    }

    pub fn holder(&self) -> Identity {
        self.body.holder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(issuer: &Keypair) -> DisclosureCapability {
        DisclosureCapability::issue(
            issuer,
            ItemId::new(3),
            Identity::from_bytes([0x05; 32]),
            1_000,
            500,
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let registry = Keypair::from_seed(&[0x42; 32]);
        let cap = issue(&registry);

        assert_eq!(cap.body.expires_at, 1_500);
        assert!(cap.verify(&registry.identity(), 1_000).is_ok());
        assert!(cap.verify(&registry.identity(), 1_499).is_ok());
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let registry = Keypair::from_seed(&[0x42; 32]);
        let cap = issue(&registry);

        assert_eq!(
            cap.verify(&registry.identity(), 1_500),
            Err(CapabilityError::Expired {
                expires_at: 1_500,
                now: 1_500,
            })
        );
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let registry = Keypair::from_seed(&[0x42; 32]);
        let other = Keypair::from_seed(&[0x43; 32]);
        let cap = issue(&other);

        assert_eq!(
            cap.verify(&registry.identity(), 1_000),
            Err(CapabilityError::WrongIssuer)
        );
    }

    #[test]
    fn test_tampered_body_rejected() {
        let registry = Keypair::from_seed(&[0x42; 32]);
        let mut cap = issue(&registry);
        cap.body.item_id = ItemId::new(4);

        assert_eq!(
            cap.verify(&registry.identity(), 1_000),
            Err(CapabilityError::BadSignature)
        );

        let mut cap = issue(&registry);
        cap.body.expires_at = i64::MAX;
        assert_eq!(
            cap.verify(&registry.identity(), 1_000),
            Err(CapabilityError::BadSignature)
        );
    }

    #[test]
    fn test_signing_message_has_domain_prefix() {
        let registry = Keypair::from_seed(&[0x42; 32]);
        let cap = issue(&registry);
        let msg = cap.body.signing_message().unwrap();
        assert!(msg.starts_with(CAPABILITY_DOMAIN));
    }
}
