//! Small helpers shared by config, routing and delivery.

use std::time::Duration;

/// Trim `value`, returning `None` when nothing is left.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Base URL without trailing slashes.
pub fn trim_base_url(value: &str) -> &str {
    value.trim_end_matches('/')
}

/// Join a base URL and a route path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", trim_base_url(base), path.trim_start_matches('/'))
}

/// Response bodies and transport errors are cut to this many characters
/// before they are stored as `last_error`.
pub const MAX_ERROR_CHARS: usize = 180;

pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(MAX_ERROR_CHARS).collect()
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
