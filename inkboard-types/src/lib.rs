//! # inkboard-types
//!
//! Core types for the inkboard dashboard. This crate defines the schema
//! shared by the collectors that fetch external feeds and the render layer
//! that composes them onto the display.
//!
//! ## Design Goals
//!
//! - **Opaque payloads**: the core never interprets feed-specific data;
//!   each source's payload is carried as structured JSON
//! - **Derived freshness**: staleness is computed from a record's age and
//!   TTL at read time, never stored
//! - **Versioned schema**: persisted snapshots include version info so a
//!   newer build can reject or migrate an old state file gracefully
//! - **Total snapshots**: a [`Snapshot`] always carries an entry for every
//!   known [`SourceId`], even before the first fetch
//!
//! ## Example
//!
//! ```rust
//! use inkboard_types::{Record, Snapshot, SourceId};
//!
//! let mut snapshot = Snapshot::empty(1_700_000_000_000);
//! snapshot.record_success(Record::new(
//!     SourceId::Weather,
//!     serde_json::json!({"temp": 21, "condition": "Clear"}),
//!     1_700_000_000_000,
//!     600_000,
//! ));
//!
//! let status = snapshot.status(SourceId::Weather);
//! assert!(status.is_fresh(1_700_000_300_000));
//! assert!(!status.is_fresh(1_700_000_700_000));
//! ```

mod frame;
mod record;
mod snapshot;
mod source;
mod status;

pub use frame::*;
pub use record::*;
pub use snapshot::*;
pub use source::*;
pub use status::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the persisted snapshot
/// format. Loaders should check this version and fall back to an empty
/// snapshot when the major version does not match.
pub const SCHEMA_VERSION: u32 = 1;
