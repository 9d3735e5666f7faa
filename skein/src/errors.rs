//! Error taxonomy adapter: wraps a remote HTTP/RPC error into a structured
//! [`RemoteError`] with retry-after parsing and retryability classification.
//!
//! Grounded on the retry-policy / retryable-error-pattern split used
//! elsewhere in the corpus for LLM provider errors; here it classifies
//! errors surfaced by MCP servers and their transports. The manager itself
//! does not retry — see [`crate::manager::McpManager::call_tool`] — callers
//! (the scheduler, or the agent loop) use [`RemoteError::is_retryable`] to
//! decide whether to back off and retry.

use chrono::{DateTime, Utc};

/// A structured remote error: status code, a provider-style error-type tag,
/// a human message, and how long to wait before retrying (if known).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub status: u16,
    pub error_type: String,
    pub message: String,
    pub retry_after_ms: Option<u64>,
}

impl RemoteError {
    pub fn new(status: u16, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type: error_type.into(),
            message: message.into(),
            retry_after_ms: None,
        }
    }

    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }
}

/// Status codes that always warrant a retry, regardless of error type.
const RETRYABLE_STATUSES: [u16; 3] = [429, 503, 529];

/// Error-type tags that warrant a retry even on a non-retryable status.
const RETRYABLE_TYPES: [&str; 2] = ["rate_limit_error", "overloaded_error"];

/// Returns whether `err` should be retried.
///
/// A 0 status (mid-stream error with no HTTP status, e.g. a dropped SSE
/// connection) is retryable only for `overloaded_error` / `api_error`, since
/// those are the two transient categories a provider can signal without a
/// status code; other zero-status errors are treated as permanent.
pub fn is_retryable(err: &RemoteError) -> bool {
    if RETRYABLE_STATUSES.contains(&err.status) {
        return true;
    }
    if RETRYABLE_TYPES.contains(&err.error_type.as_str()) {
        return true;
    }
    if err.status == 0 {
        return matches!(err.error_type.as_str(), "overloaded_error" | "api_error");
    }
    false
}

/// Parses a retry-after duration from response headers, trying in order:
/// an integer-millisecond `retry-after-ms` header, an integer-second
/// `Retry-After` header, or an RFC1123 HTTP-date `Retry-After` header
/// (duration from `now` to that date).
pub fn retry_after(headers: &dyn HeaderLookup, now: DateTime<Utc>) -> Option<u64> {
    if let Some(ms) = headers.get("retry-after-ms").and_then(|v| v.parse::<u64>().ok()) {
        return Some(ms);
    }
    let raw = headers.get("retry-after")?;
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs * 1000);
    }
    let date = DateTime::parse_from_rfc2822(&raw).ok()?.with_timezone(&Utc);
    let delta = date.signed_duration_since(now);
    u64::try_from(delta.num_milliseconds()).ok()
}

/// Injectable header accessor so [`retry_after`] can be tested without a
/// real HTTP response.
pub trait HeaderLookup {
    fn get(&self, name: &str) -> Option<String>;
}

impl HeaderLookup for std::collections::HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}
