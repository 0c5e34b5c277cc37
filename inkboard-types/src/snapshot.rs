//! The full point-in-time view of every source.

use std::collections::BTreeMap;

use crate::{Record, SourceId, SourceStatus, SCHEMA_VERSION};

/// Schema version embedded in persisted snapshots.
///
/// Lets a loader detect a state file written by an incompatible build and
/// fall back to a clean slate instead of misreading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SchemaVersion {
    /// Breaking changes increment this.
    pub major: u32,
    /// Backwards-compatible additions increment this.
    pub minor: u32,
}

impl SchemaVersion {
    /// The version written by this build.
    pub const fn current() -> Self {
        Self {
            major: SCHEMA_VERSION,
            minor: 0,
        }
    }

    /// Whether a loaded snapshot can be read by this build.
    ///
    /// Minor differences are fine; a major mismatch is not.
    pub fn is_compatible(&self) -> bool {
        self.major == SCHEMA_VERSION
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

/// The dashboard's single source of truth: one [`SourceStatus`] per known
/// [`SourceId`].
///
/// The map is total by construction: [`Snapshot::empty`] seeds every
/// source and [`Snapshot::normalize`] restores any entry a forward-
/// compatible load found missing. Mutation happens one source at a time via
/// [`record_success`](Snapshot::record_success) and
/// [`record_failure`](Snapshot::record_failure); the snapshot is never
/// wholesale replaced once created.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// Schema version for forward compatibility.
    #[serde(default)]
    pub version: SchemaVersion,

    /// Unix timestamp in milliseconds of the last mutation.
    #[serde(default)]
    pub updated_at_ms: u64,

    /// Per-source state, keyed by source name. Keys that no longer map to
    /// a known source are dropped on load rather than failing the whole
    /// snapshot.
    #[serde(default, deserialize_with = "known_sources_only")]
    pub sources: BTreeMap<SourceId, SourceStatus>,
}

fn known_sources_only<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<SourceId, SourceStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    let raw = BTreeMap::<String, SourceStatus>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, status)| name.parse::<SourceId>().ok().map(|id| (id, status)))
        .collect())
}

impl Snapshot {
    /// A first-boot snapshot: every source present, none ever fetched.
    pub fn empty(now_ms: u64) -> Self {
        let sources = SourceId::ALL
            .into_iter()
            .map(|id| (id, SourceStatus::empty()))
            .collect();
        Self {
            version: SchemaVersion::current(),
            updated_at_ms: now_ms,
            sources,
        }
    }

    /// Ensure every known source has an entry.
    ///
    /// Loaded state files may predate a source's existence; a missing entry
    /// is treated as "never fetched" rather than an error.
    pub fn normalize(&mut self) {
        for id in SourceId::ALL {
            self.sources.entry(id).or_insert_with(SourceStatus::empty);
        }
    }

    /// Status for one source.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot was deserialized without
    /// [`normalize`](Snapshot::normalize) being called. Snapshots built via
    /// [`empty`](Snapshot::empty) are always total.
    pub fn status(&self, id: SourceId) -> &SourceStatus {
        self.sources
            .get(&id)
            .expect("snapshot entry missing; normalize() not called after load")
    }

    /// Apply a successful fetch to the owning source's entry.
    pub fn record_success(&mut self, record: Record) {
        let fetched_at_ms = record.fetched_at_ms;
        self.sources
            .entry(record.source)
            .or_insert_with(SourceStatus::empty)
            .apply_success(record);
        self.updated_at_ms = self.updated_at_ms.max(fetched_at_ms);
    }

    /// Apply a failed fetch to one source's entry.
    pub fn record_failure(
        &mut self,
        id: SourceId,
        message: impl Into<String>,
        occurred_at_ms: u64,
    ) {
        self.sources
            .entry(id)
            .or_insert_with(SourceStatus::empty)
            .apply_failure(message, occurred_at_ms);
        self.updated_at_ms = self.updated_at_ms.max(occurred_at_ms);
    }

    /// Iterate over all sources in key order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &SourceStatus)> {
        self.sources.iter().map(|(id, status)| (*id, status))
    }

    /// Number of sources with at least one successful fetch.
    pub fn populated_count(&self) -> usize {
        self.sources
            .values()
            .filter(|s| s.last_success.is_some())
            .count()
    }
}

/// Current unix time in milliseconds.
///
/// The shared clock for collectors and the core. A clock before the unix
/// epoch reads as zero.
pub fn unix_time_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
