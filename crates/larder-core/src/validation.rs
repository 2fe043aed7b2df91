//! Input validation for registration and pricing.

use crate::error::ValidationError;
use crate::producer::ProducerProfile;
use crate::types::Amount;

/// Default maximum display name length, in characters.
pub const DEFAULT_MAX_DISPLAY_NAME_LEN: usize = 64;

/// Default maximum bio length, in characters.
pub const DEFAULT_MAX_BIO_LEN: usize = 1024;

/// Default maximum contact length, in characters.
pub const DEFAULT_MAX_CONTACT_LEN: usize = 256;

/// Bounds applied to caller-supplied values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_display_name_len: usize,
    pub max_bio_len: usize,
    pub max_contact_len: usize,
    /// Highest price an item may carry.
    pub max_price: Amount,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_display_name_len: DEFAULT_MAX_DISPLAY_NAME_LEN,
            max_bio_len: DEFAULT_MAX_BIO_LEN,
            max_contact_len: DEFAULT_MAX_CONTACT_LEN,
            max_price: Amount::MAX,
        }
    }
}

/// Validate a producer profile.
///
/// The display name must contain a non-whitespace character; every field
/// must fit its length limit; a contact, when given, must be non-empty.
pub fn validate_profile(
    profile: &ProducerProfile,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    if profile.display_name.trim().is_empty() {
        return Err(ValidationError::InvalidProfile(
            "display name is empty".into(),
        ));
    }

    let name_len = profile.display_name.chars().count();
    if name_len > limits.max_display_name_len {
        return Err(ValidationError::InvalidProfile(format!(
            "display name is {} characters, maximum is {}",
            name_len, limits.max_display_name_len
        )));
    }

    let bio_len = profile.bio.chars().count();
    if bio_len > limits.max_bio_len {
        return Err(ValidationError::InvalidProfile(format!(
            "bio is {} characters, maximum is {}",
            bio_len, limits.max_bio_len
        )));
    }

    if let Some(contact) = &profile.contact {
        if contact.trim().is_empty() {
            return Err(ValidationError::InvalidProfile("contact is empty".into()));
        }
        let contact_len = contact.chars().count();
        if contact_len > limits.max_contact_len {
            return Err(ValidationError::InvalidProfile(format!(
                "contact is {} characters, maximum is {}",
                contact_len, limits.max_contact_len
            )));
        }
    }

    Ok(())
}

/// Validate an item price against the configured ceiling.
pub fn validate_price(price: Amount, limits: &ValidationLimits) -> Result<(), ValidationError> {
    if price > limits.max_price {
        return Err(ValidationError::InvalidPrice {
            price,
            max: limits.max_price,
        });
    }
    Ok(())
}
