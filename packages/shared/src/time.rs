//! Time utilities for connection bookkeeping and message display.

use chrono::{LocalResult, TimeZone, Utc};

/// Get the current Unix timestamp in milliseconds (UTC).
pub fn now_unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a Unix timestamp (milliseconds) to RFC 3339 format (UTC).
pub fn timestamp_to_rfc3339(timestamp_millis: i64) -> String {
    let seconds = timestamp_millis.div_euclid(1000);
    let nanos = (timestamp_millis.rem_euclid(1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(seconds, nanos) {
        LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => format!("invalid timestamp ({})", timestamp_millis),
    }
}
