use std::time::Duration;

/// Retry policy for identity provider requests.
///
/// `max_attempts` quick retries with a fixed `delay` between
/// consecutive attempts. Pure configuration; the retry loop itself
/// lives next to the shared attempt counter in the token manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}
