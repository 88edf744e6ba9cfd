use chrono::Utc;

/// Current UTC clock in milliseconds since the epoch.
///
/// All token timestamps and delay math use this unit.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
