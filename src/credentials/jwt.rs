use std::collections::HashMap;

use anyhow::anyhow;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::credentials::token::Token;
use crate::error::TokenError;
use crate::helpers::time::now_ms;

/// Build a [`Token`] from a compact JWT without verifying its signature.
///
/// The payload is trusted as-is; claim values are flattened to strings.
/// `exp` and `iat` are RFC 7519 seconds and converted to milliseconds.
/// A missing `exp` (or the `-1` sentinel) yields a non-expiring token;
/// a missing `iat` falls back to the current clock.
pub fn decode_unverified(raw: &str) -> Result<Token, TokenError> {
    let mut segments = raw.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_header), Some(payload)) if !payload.is_empty() => payload,
        _ => {
            return Err(TokenError::RequestToken(anyhow!(
                "malformed JWT: expected dot-separated header and payload"
            )))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::RequestToken(anyhow!("JWT payload is not base64url: {e}")))?;
    let decoded: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::RequestToken(anyhow!("JWT payload is not a JSON object: {e}")))?;

    let expires_at_ms = match decoded.get("exp").and_then(serde_json::Value::as_i64) {
        None | Some(-1) => None,
        Some(seconds) => Some(seconds * 1000),
    };
    let received_at_ms = decoded
        .get("iat")
        .and_then(serde_json::Value::as_i64)
        .map(|seconds| seconds * 1000)
        .unwrap_or_else(now_ms);

    let mut claims = HashMap::with_capacity(decoded.len());
    for (key, value) in &decoded {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        claims.insert(key.clone(), rendered);
    }

    Ok(Token::new(
        raw.to_owned(),
        expires_at_ms,
        received_at_ms,
        claims,
    ))
}
