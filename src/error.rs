use thiserror::Error;

/// Errors raised by token acquisition and the renewal scheduler.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The identity provider call failed or exceeded its execution
    /// timeout. Retryable according to the configured retry policy.
    #[error("identity provider request failed: {0}")]
    RequestToken(#[source] anyhow::Error),

    /// A renewal cycle failed after the provider call nominally
    /// succeeded, e.g. the token arrived already expired or the
    /// consumer's on_next callback rejected it. Terminal for the cycle.
    #[error("token renewal failed: {0}")]
    TokenRenewal(String),

    /// API misuse, e.g. calling `start` twice.
    #[error("invalid token manager state: {0}")]
    InvalidState(&'static str),

    #[error("invalid token manager configuration: {0}")]
    InvalidConfig(String),
}
