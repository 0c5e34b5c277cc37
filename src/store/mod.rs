//! The snapshot store: the single shared, durable source of truth.
//!
//! Collection tasks write one source entry at a time; the render loop
//! clones a consistent view whenever it runs. A `parking_lot` RwLock
//! guards the whole snapshot: entries are independent, writes are brief,
//! and readers never observe a half-applied update.
//!
//! Persistence failures are logged and swallowed: losing durability is an
//! accepted degradation, crashing either loop is not.

mod persist;

pub use persist::StoreError;

use std::path::PathBuf;

use inkboard_types::{unix_time_ms, Record, Snapshot, SourceId};
use parking_lot::RwLock;
use tracing::{info, warn};

/// Shared handle to the current snapshot plus its backing file.
#[derive(Debug)]
pub struct SnapshotStore {
    inner: RwLock<Snapshot>,
    path: Option<PathBuf>,
}

impl SnapshotStore {
    /// Open a store backed by `path`.
    ///
    /// A missing file is first boot; a corrupt or version-incompatible
    /// file is discarded in favor of a clean slate. Neither is an error;
    /// the dashboard must come up regardless.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let now_ms = unix_time_ms();

        let snapshot = match persist::load(&path) {
            Ok(mut snapshot) => {
                if snapshot.version.is_compatible() {
                    snapshot.normalize();
                    info!(
                        path = %path.display(),
                        populated = snapshot.populated_count(),
                        "loaded snapshot state"
                    );
                    snapshot
                } else {
                    warn!(
                        path = %path.display(),
                        major = snapshot.version.major,
                        "state file has incompatible schema version; starting fresh"
                    );
                    Snapshot::empty(now_ms)
                }
            }
            Err(StoreError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no snapshot state yet; starting fresh");
                Snapshot::empty(now_ms)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not load snapshot state; starting fresh");
                Snapshot::empty(now_ms)
            }
        };

        Self {
            inner: RwLock::new(snapshot),
            path: Some(path),
        }
    }

    /// A store with no backing file. Used by tests and `--once` dry runs.
    pub fn in_memory(now_ms: u64) -> Self {
        Self {
            inner: RwLock::new(Snapshot::empty(now_ms)),
            path: None,
        }
    }

    /// Clone the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }

    /// Apply a successful fetch and flush to durable storage.
    pub fn record_success(&self, record: Record) {
        let mut guard = self.inner.write();
        guard.record_success(record);
        let snapshot = guard.clone();
        drop(guard);

        self.flush(&snapshot);
    }

    /// Apply a failed fetch and flush to durable storage.
    ///
    /// Returns the source's failure count after the update, which drives
    /// the caller's backoff.
    pub fn record_failure(
        &self,
        source: SourceId,
        message: impl Into<String>,
        occurred_at_ms: u64,
    ) -> u32 {
        let mut guard = self.inner.write();
        guard.record_failure(source, message, occurred_at_ms);
        let failures = guard.status(source).consecutive_failures;
        let snapshot = guard.clone();
        drop(guard);

        self.flush(&snapshot);
        failures
    }

    fn flush(&self, snapshot: &Snapshot) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = persist::save(path, snapshot) {
            warn!(path = %path.display(), error = %err, "failed to persist snapshot; continuing in memory");
        }
    }
}
