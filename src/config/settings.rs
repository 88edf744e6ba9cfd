use std::time::Duration;

use serde::Deserialize;

use crate::manager::config::TokenManagerConfig;
use crate::resilience::retry::RetryPolicy;

/// ================================
/// Keeper-wide settings (file form)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct KeeperSettings {
    #[serde(default = "default_expiration_refresh_ratio")]
    pub expiration_refresh_ratio: f64,
    /// 0 disables the bound, refresh is ratio-driven only
    #[serde(default)]
    pub lower_refresh_bound_ms: u64,
    /// hard bound on a single provider request, 0 disables it
    #[serde(default = "default_request_execution_timeout_ms")]
    pub request_execution_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    pub logging: Option<LoggingConfig>,
}

impl KeeperSettings {
    pub fn manager_config(&self) -> TokenManagerConfig {
        TokenManagerConfig {
            expiration_refresh_ratio: self.expiration_refresh_ratio,
            lower_refresh_bound: Duration::from_millis(self.lower_refresh_bound_ms),
            request_execution_timeout: Duration::from_millis(self.request_execution_timeout_ms),
            retry_policy: RetryPolicy::new(
                self.retry.max_attempts,
                Duration::from_millis(self.retry.delay_ms),
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    /// fixed delay between consecutive attempts
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_expiration_refresh_ratio() -> f64 {
    0.8
}

fn default_request_execution_timeout_ms() -> u64 {
    1000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}
