//! Registry configuration.

use larder_core::ValidationLimits;

/// Default reputation assigned at registration.
pub const DEFAULT_INITIAL_REPUTATION: u32 = 100;

/// Default disclosure capability lifetime: 15 minutes.
pub const DEFAULT_CAPABILITY_TTL_MS: i64 = 15 * 60 * 1000;

/// Configuration for the Registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Bounds on profiles and prices.
    pub limits: ValidationLimits,
    /// Reputation baseline for newly registered producers.
    pub initial_reputation: u32,
    /// How long an issued disclosure capability stays valid.
    pub capability_ttl_ms: i64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            limits: ValidationLimits::default(),
            initial_reputation: DEFAULT_INITIAL_REPUTATION,
            capability_ttl_ms: DEFAULT_CAPABILITY_TTL_MS,
        }
    }
}
