//! Durable storage for the snapshot.
//!
//! The snapshot is persisted as pretty-printed JSON. Writes go through a
//! sibling temp file and a rename so a crash mid-write leaves the previous
//! state file intact rather than a truncated one.

use std::fs;
use std::path::Path;

use inkboard_types::Snapshot;
use thiserror::Error;

/// Errors from reading or writing the state file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read/write failed.
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file contents could not be (de)serialized.
    #[error("state file format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Read a snapshot from `path`.
///
/// The caller decides what a failure means; first boot (no file yet) and a
/// corrupt file both fall back to an empty snapshot at the store layer.
pub fn load(path: &Path) -> Result<Snapshot, StoreError> {
    let content = fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&content)?;
    Ok(snapshot)
}

/// Write `snapshot` to `path` atomically.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(snapshot)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
