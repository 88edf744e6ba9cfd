use std::time::Duration;

use crate::manager::config::TokenManagerConfig;

/// Delay until the next proactive renewal for a token received at
/// `received_at_ms` and expiring at `expires_at_ms`.
///
/// Two candidate delays, the smaller wins, clamped at zero:
/// - ratio refresh: fires once `expiration_refresh_ratio` of the
///   token's lifetime has elapsed
/// - lower-bound refresh: fires `lower_refresh_bound` before expiry
///   (disabled when the bound is zero)
///
/// Takes the clock as `now_ms` so the math stays side-effect free.
pub fn renewal_delay(
    config: &TokenManagerConfig,
    expires_at_ms: i64,
    received_at_ms: i64,
    now_ms: i64,
) -> Duration {
    let ratio_delay = delay_for_ratio_refresh(config, expires_at_ms, received_at_ms, now_ms);
    let bound_delay = delay_for_lower_refresh(config, expires_at_ms, now_ms);

    let delay = ratio_delay.min(bound_delay);
    if delay <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_millis(delay as u64)
    }
}

fn delay_for_ratio_refresh(
    config: &TokenManagerConfig,
    expires_at_ms: i64,
    received_at_ms: i64,
    now_ms: i64,
) -> f64 {
    let token_ttl = (expires_at_ms - received_at_ms) as f64;
    let refresh_before = token_ttl - token_ttl * config.expiration_refresh_ratio;

    expires_at_ms as f64 - refresh_before - now_ms as f64
}

fn delay_for_lower_refresh(config: &TokenManagerConfig, expires_at_ms: i64, now_ms: i64) -> f64 {
    let bound_ms = config.lower_refresh_bound.as_millis() as f64;
    if bound_ms == 0.0 {
        // bound disabled, must never win the min
        return f64::INFINITY;
    }

    expires_at_ms as f64 - bound_ms - now_ms as f64
}
