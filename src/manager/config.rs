use std::time::Duration;

use crate::error::TokenError;
use crate::resilience::retry::RetryPolicy;

/// Scheduling configuration for a token manager. Immutable once the
/// manager is constructed.
#[derive(Debug, Clone)]
pub struct TokenManagerConfig {
    /// Fraction of a token's lifetime after which a refresh fires.
    /// 0.8 renews once 80% of the lifetime has elapsed.
    pub expiration_refresh_ratio: f64,
    /// Fixed lower bound: refresh no later than this long before
    /// expiry. Zero disables the bound and only the ratio applies.
    pub lower_refresh_bound: Duration,
    /// Hard bound on a single provider call; exceeding it counts as a
    /// provider failure. Zero disables the bound.
    pub request_execution_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl TokenManagerConfig {
    pub fn validate(&self) -> Result<(), TokenError> {
        if !(self.expiration_refresh_ratio > 0.0 && self.expiration_refresh_ratio < 1.0) {
            return Err(TokenError::InvalidConfig(format!(
                "expiration_refresh_ratio must be within (0, 1), got {}",
                self.expiration_refresh_ratio
            )));
        }
        Ok(())
    }
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self {
            expiration_refresh_ratio: 0.8,
            lower_refresh_bound: Duration::ZERO,
            request_execution_timeout: Duration::from_millis(1000),
            retry_policy: RetryPolicy::default(),
        }
    }
}
