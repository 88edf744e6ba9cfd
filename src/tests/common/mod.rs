// tests/common/mod.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::credentials::token::Token;
use crate::error::TokenError;
use crate::helpers::time::now_ms;
use crate::manager::listener::CredentialsListener;
use crate::provider::IdentityProvider;

/// One scripted provider outcome.
pub enum Scripted {
    Ok { ttl_ms: i64 },
    OkNeverExpires,
    OkExpired,
    Fail,
}

/// Identity provider driven by a script of outcomes; repeats the last
/// entry once the script is exhausted.
pub struct FakeProvider {
    script: Vec<Scripted>,
    calls: AtomicUsize,
    latency: Duration,
}

impl FakeProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Artificial delay before every response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn request_token(&self, _force_refresh: bool) -> Result<Token, TokenError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let step = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .expect("provider script must not be empty");
        let now = now_ms();
        match step {
            Scripted::Ok { ttl_ms } => Ok(test_token(now, Some(now + ttl_ms))),
            Scripted::OkNeverExpires => Ok(test_token(now, None)),
            Scripted::OkExpired => Ok(test_token(now - 200, Some(now - 100))),
            Scripted::Fail => Err(TokenError::RequestToken(anyhow!(
                "scripted provider failure"
            ))),
        }
    }
}

pub fn test_token(received_at_ms: i64, expires_at_ms: Option<i64>) -> Token {
    let mut claims = HashMap::new();
    claims.insert("oid".to_string(), "test".to_string());
    Token::new("value".to_string(), expires_at_ms, received_at_ms, claims)
}

/// Deliveries captured for assertions.
#[derive(Default)]
pub struct Recorded {
    pub tokens: Mutex<Vec<Token>>,
    pub errors: Mutex<Vec<String>>,
}

/// Listener that appends every delivery to `recorded`.
pub fn recording_listener(recorded: &Arc<Recorded>) -> Arc<CredentialsListener> {
    let on_next = recorded.clone();
    let on_error = recorded.clone();
    Arc::new(
        CredentialsListener::new()
            .with_on_next(move |token| {
                on_next.tokens.lock().push(token);
                Ok(())
            })
            .with_on_error(move |err| {
                on_error.errors.lock().push(err.to_string());
            }),
    )
}
