//! # inkboard
//!
//! Data-freshness and render-orchestration core for an e-paper home
//! dashboard: calendar, reminders, transit departures, news headlines,
//! weather, and an indoor sensor on one slow, power-sipping panel.
//!
//! ## Architecture
//!
//! ```text
//!  collectors (one task per source, own cadence, own backoff)
//!      │ Record | FetchError
//!      ▼
//!  ┌───────────────┐   clone   ┌────────────────────┐  Frame  ┌─────────┐
//!  │ SnapshotStore │ ────────▶ │ RenderOrchestrator │ ──────▶ │ Display │
//!  │  (durable)    │           │   (own cadence)    │         │  Sink   │
//!  └───────────────┘           └────────────────────┘         └─────────┘
//! ```
//!
//! Data flows one way; the two periodic loops meet only at the store. The
//! guarantees the rest of the crate is built around:
//!
//! - the snapshot always has an entry for every source
//! - a failing source never loses its last good data, and never affects
//!   any other source
//! - the renderer always produces a complete frame (fresh, stale-marked,
//!   or placeholder per slot) and never fails the frame for one slot
//! - nothing in this crate treats a fetch, render, display, or persistence
//!   error as fatal
//!
//! The feed collectors live in `inkboard-collectors` and the shared schema
//! in `inkboard-types`; this crate is the orchestration between them.

pub mod collect;
pub mod config;
pub mod display;
pub mod feeds;
pub mod render;
pub mod store;

pub use config::Settings;
pub use display::{DisplayDriver, DisplaySink, SimulatorDriver};
pub use render::{GridRenderer, RenderOrchestrator, Renderer, SlotContent};
pub use store::SnapshotStore;
