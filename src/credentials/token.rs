use std::collections::HashMap;

use crate::helpers::time::now_ms;

/// Credential issued by an identity provider.
///
/// Immutable once constructed. `expires_at_ms` of `None` marks a token
/// that never expires. Invariant: when finite, `expires_at_ms` is not
/// earlier than `received_at_ms`.
#[derive(Debug, Clone)]
pub struct Token {
    value: String,
    expires_at_ms: Option<i64>,
    received_at_ms: i64,
    claims: HashMap<String, String>,
}

impl Token {
    pub fn new(
        value: String,
        expires_at_ms: Option<i64>,
        received_at_ms: i64,
        claims: HashMap<String, String>,
    ) -> Self {
        debug_assert!(expires_at_ms.map_or(true, |exp| exp >= received_at_ms));
        Self {
            value,
            expires_at_ms,
            received_at_ms,
            claims,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at_ms(&self) -> Option<i64> {
        self.expires_at_ms
    }

    pub fn received_at_ms(&self) -> i64 {
        self.received_at_ms
    }

    /// Remaining lifetime against the current clock. `None` for a
    /// non-expiring token.
    pub fn ttl_ms(&self) -> Option<i64> {
        self.expires_at_ms.map(|expires_at| expires_at - now_ms())
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.ttl_ms(), Some(ttl) if ttl <= 0)
    }

    /// Claim lookup by key.
    pub fn try_get(&self, key: &str) -> Option<&str> {
        self.claims.get(key).map(String::as_str)
    }
}

/// Result of a single acquisition. Handed to the caller and not
/// retained by the manager.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    token: Token,
}

impl TokenResponse {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    /// Total lifetime of the wrapped token, `None` when it never
    /// expires.
    pub fn ttl_ms(&self) -> Option<i64> {
        self.token
            .expires_at_ms
            .map(|expires_at| expires_at - self.token.received_at_ms)
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn into_token(self) -> Token {
        self.token
    }
}
