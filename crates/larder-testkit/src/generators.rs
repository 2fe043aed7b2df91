//! Proptest generators for property-based testing.

use proptest::prelude::*;

use larder_core::{Amount, Identity, Keypair, ProducerProfile};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    keypair().prop_map(|kp| kp.identity())
}

/// Generate a small amount, zero included.
pub fn amount() -> impl Strategy<Value = Amount> {
    (0u64..=200).prop_map(Amount::new)
}

/// Generate a profile that passes default validation.
pub fn valid_profile() -> impl Strategy<Value = ProducerProfile> {
    (
        "[A-Za-z][A-Za-z0-9 ]{0,40}",
        ".{0,80}",
        proptest::option::of("[a-z]{1,12}@[a-z]{1,12}\\.com"),
    )
        .prop_map(|(name, bio, contact)| {
            let profile = ProducerProfile::new(name, bio);
            match contact {
                Some(contact) => profile.with_contact(contact),
                None => profile,
            }
        })
}

/// Generate a profile that fails default validation.
pub fn invalid_profile() -> impl Strategy<Value = ProducerProfile> {
    prop_oneof![
        "[ \t]{0,8}".prop_map(|name| ProducerProfile::new(name, "")),
        "[a-z]{65,80}".prop_map(|name| ProducerProfile::new(name, "")),
        "[a-z]{1025,1040}".prop_map(|bio| ProducerProfile::new("Chef", bio)),
        Just(ProducerProfile::new("Chef", "").with_contact("")),
    ]
}

/// A single registry operation.
///
/// Indices are resolved modulo the items, requests or diners that exist
/// when the operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Publish { price: u64, public: bool },
    Request { item: usize, diner: usize, payment: u64 },
    Approve { request: usize },
    Deny { request: usize },
    /// Approval attempted by a diner instead of the owner.
    ForeignApprove { request: usize, diner: usize },
    SetPublic { item: usize },
    SetPrice { item: usize, price: u64 },
    /// Arm the rail to fail the next disbursement.
    FailNextDisbursement,
}

/// Generate a single operation.
pub fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0u64..=50, prop::bool::weighted(0.2))
            .prop_map(|(price, public)| Op::Publish { price, public }),
        4 => (any::<usize>(), any::<usize>(), 0u64..=60)
            .prop_map(|(item, diner, payment)| Op::Request { item, diner, payment }),
        3 => any::<usize>().prop_map(|request| Op::Approve { request }),
        2 => any::<usize>().prop_map(|request| Op::Deny { request }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(request, diner)| Op::ForeignApprove { request, diner }),
        1 => any::<usize>().prop_map(|item| Op::SetPublic { item }),
        1 => (any::<usize>(), 0u64..=50).prop_map(|(item, price)| Op::SetPrice { item, price }),
        1 => Just(Op::FailNextDisbursement),
    ]
}

/// Generate a sequence of up to `max` operations, starting with a publish.
pub fn ops(max: usize) -> impl Strategy<Value = Vec<Op>> {
    (
        (0u64..=50).prop_map(|price| Op::Publish {
            price,
            public: false,
        }),
        prop::collection::vec(op(), 0..max),
    )
        .prop_map(|(first, rest)| {
            let mut ops = Vec::with_capacity(rest.len() + 1);
            ops.push(first);
            ops.extend(rest);
            ops
        })
}
