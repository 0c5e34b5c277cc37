//! Per-source state tracked across fetch cycles.

use crate::Record;

/// Everything the dashboard knows about one source.
///
/// A failed fetch never discards the previous success: stale-but-present
/// data outranks no data, so `last_success` survives until the next
/// successful fetch replaces it.
#[derive(Debug, Clone, PartialEq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SourceStatus {
    /// The most recent successful fetch, if any ever completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<Record>,

    /// The most recent failure, cleared by the next success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<SourceError>,

    /// Failures since the last success. Drives retry backoff.
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl SourceStatus {
    /// A source that has never been fetched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the last success is present and within its TTL at `now_ms`.
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        self.last_success
            .as_ref()
            .map(|r| !r.is_expired(now_ms))
            .unwrap_or(false)
    }

    /// Apply a successful fetch: replaces the record, clears the error
    /// state, and resets the failure counter.
    pub fn apply_success(&mut self, record: Record) {
        self.last_success = Some(record);
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    /// Apply a failed fetch: records the error and bumps the failure
    /// counter. `last_success` is left untouched.
    pub fn apply_failure(&mut self, message: impl Into<String>, occurred_at_ms: u64) {
        self.last_error = Some(SourceError {
            message: message.into(),
            occurred_at_ms,
        });
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// A fetch failure surfaced for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SourceError {
    /// Human-readable failure description.
    pub message: String,

    /// Unix timestamp in milliseconds when the failure happened.
    pub occurred_at_ms: u64,
}
