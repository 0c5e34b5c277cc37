//! Successful fetch results.

use serde_json::Value;

use crate::SourceId;

/// The result of one successful fetch from a source.
///
/// The payload shape is source-specific and opaque to the core: the weather
/// collector stores current conditions, the transit collector a departure
/// list, and so on. The render layer hands the payload through to the slot
/// layout without interpreting it.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Record {
    /// Which feed produced this record.
    pub source: SourceId,

    /// Source-specific structured data.
    pub payload: Value,

    /// Unix timestamp in milliseconds when the fetch completed.
    pub fetched_at_ms: u64,

    /// How long the payload is considered fresh, in milliseconds.
    pub ttl_ms: u64,
}

impl Record {
    /// Create a record fetched at the given instant.
    pub fn new(source: SourceId, payload: Value, fetched_at_ms: u64, ttl_ms: u64) -> Self {
        Self {
            source,
            payload,
            fetched_at_ms,
            ttl_ms,
        }
    }

    /// Age of this record at `now_ms`.
    ///
    /// A record fetched in the future (clock adjustment between cycles)
    /// reports age zero rather than underflowing.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.fetched_at_ms)
    }

    /// Whether the record has outlived its TTL at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age_ms(now_ms) > self.ttl_ms
    }
}
