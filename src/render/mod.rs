//! The render orchestrator.
//!
//! On its own cadence, coarser than any collection cadence, this reads
//! the full snapshot and turns it into one composite frame. Every source
//! gets a slot no matter what state it is in: fresh data renders as-is,
//! expired data renders with a stale marker, and a source that has never
//! succeeded renders an explicit placeholder. A single dead feed can cost
//! its own slot at most.
//!
//! Composition is a pure function of the resolved slots, so an unchanged
//! snapshot yields a byte-identical bitmap and the sink can skip the
//! (slow, flashing) panel refresh entirely.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use inkboard_types::{unix_time_ms, Bitmap, Frame, Snapshot, SourceId};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::display::DisplaySink;
use crate::store::SnapshotStore;

/// Composition failure reported by the renderer collaborator.
///
/// Recoverable: the whole cycle is skipped and retried next cadence while
/// the previous image stays on the panel.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The layout could not compose the slots.
    #[error("composition failed: {0}")]
    Compose(String),
}

/// What the layout should show for one source slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotContent {
    /// Fresh payload, render normally.
    Ready { payload: Value },
    /// Payload older than its TTL; still the best data there is.
    /// Layouts render it dimmed/aged rather than dropping it.
    Stale { payload: Value, age_ms: u64 },
    /// Nothing ever fetched (or stale past the configured cutoff).
    Placeholder,
}

/// Decide what one source's slot shows at `now_ms`.
pub fn resolve_slot(
    snapshot: &Snapshot,
    id: SourceId,
    now_ms: u64,
    max_staleness: Option<Duration>,
) -> SlotContent {
    let status = snapshot.status(id);
    let Some(record) = &status.last_success else {
        return SlotContent::Placeholder;
    };

    if status.is_fresh(now_ms) {
        return SlotContent::Ready {
            payload: record.payload.clone(),
        };
    }

    let age_ms = record.age_ms(now_ms);
    if let Some(cutoff) = max_staleness {
        if age_ms > cutoff.as_millis() as u64 {
            return SlotContent::Placeholder;
        }
    }
    SlotContent::Stale {
        payload: record.payload.clone(),
        age_ms,
    }
}

/// Resolve every known source. The result is total: one entry per
/// [`SourceId`], always.
pub fn resolve_slots(
    snapshot: &Snapshot,
    now_ms: u64,
    max_staleness: &BTreeMap<SourceId, Option<Duration>>,
) -> BTreeMap<SourceId, SlotContent> {
    SourceId::ALL
        .into_iter()
        .map(|id| {
            let cutoff = max_staleness.get(&id).copied().flatten();
            (id, resolve_slot(snapshot, id, now_ms, cutoff))
        })
        .collect()
}

/// Pixel layout collaborator.
///
/// `compose` must be deterministic in its input (no clocks, no RNG) so
/// that rendering an unchanged snapshot reproduces the exact bitmap.
pub trait Renderer: Send {
    /// Compose all slots into one bitmap. Infallible for well-formed
    /// slots; an error here aborts the cycle, never the process.
    fn compose(&self, slots: &BTreeMap<SourceId, SlotContent>) -> Result<Bitmap, RenderError>;
}

/// Character-cell renderer used by the simulator driver.
///
/// Renders each slot as a titled text block. Real panels get a pixel
/// renderer behind the same trait; this one exists so the whole pipeline
/// runs (and is testable) without typography or hardware.
#[derive(Debug, Default)]
pub struct GridRenderer {
    _private: (),
}

const GRID_COLS: usize = 48;
const MAX_SLOT_LINES: usize = 6;

impl GridRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_block(id: SourceId, content: &SlotContent, out: &mut Vec<String>) {
        let marker = match content {
            SlotContent::Ready { .. } => "",
            SlotContent::Stale { .. } => " (stale)",
            SlotContent::Placeholder => "",
        };
        let header = format!("== {}{} ", id.title(), marker);
        let mut line = header;
        while line.len() < GRID_COLS {
            line.push('=');
        }
        out.push(line);

        match content {
            SlotContent::Placeholder => out.push(clip("no data yet")),
            SlotContent::Ready { payload } | SlotContent::Stale { payload, .. } => {
                payload_lines(payload, out);
            }
        }
    }
}

impl Renderer for GridRenderer {
    fn compose(&self, slots: &BTreeMap<SourceId, SlotContent>) -> Result<Bitmap, RenderError> {
        let mut lines = Vec::new();
        for id in SourceId::ALL {
            let content = slots
                .get(&id)
                .ok_or_else(|| RenderError::Compose(format!("missing slot: {}", id)))?;
            Self::slot_block(id, content, &mut lines);
        }

        let height = lines.len() as u32;
        let data = lines.join("\n").into_bytes();
        Ok(Bitmap::new(GRID_COLS as u32, height, data))
    }
}

/// Flatten a payload into display lines, capped per slot.
fn payload_lines(payload: &Value, out: &mut Vec<String>) {
    let mut lines = Vec::new();
    match payload {
        Value::Object(map) => {
            for (key, value) in map {
                lines.push(clip(&format!("{}: {}", key, scalar(value))));
            }
        }
        Value::Array(items) if items.is_empty() => lines.push(clip("(empty)")),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(map) => {
                        let row: Vec<String> = map.values().map(scalar).collect();
                        lines.push(clip(&row.join("  ")));
                    }
                    other => lines.push(clip(&scalar(other))),
                }
            }
        }
        other => lines.push(clip(&scalar(other))),
    }
    lines.truncate(MAX_SLOT_LINES);
    out.extend(lines);
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn clip(s: &str) -> String {
    s.chars().take(GRID_COLS).collect()
}

/// Outcome of one render cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A new frame was pushed to the panel.
    Delivered,
    /// The bitmap matched the last delivered frame; the panel was left
    /// alone.
    Unchanged,
    /// The driver rejected the frame; it was discarded.
    NotDelivered,
}

/// Owns the render cadence: snapshot in, frame out.
pub struct RenderOrchestrator {
    store: Arc<SnapshotStore>,
    renderer: Box<dyn Renderer>,
    sink: DisplaySink,
    max_staleness: BTreeMap<SourceId, Option<Duration>>,
    last_delivered: Option<Bitmap>,
}

impl RenderOrchestrator {
    pub fn new(
        store: Arc<SnapshotStore>,
        renderer: Box<dyn Renderer>,
        sink: DisplaySink,
        max_staleness: BTreeMap<SourceId, Option<Duration>>,
    ) -> Self {
        Self {
            store,
            renderer,
            sink,
            max_staleness,
            last_delivered: None,
        }
    }

    /// Run one full cycle: resolve, compose, present.
    pub fn render_once(&mut self, now_ms: u64) -> Result<RenderOutcome, RenderError> {
        let snapshot = self.store.snapshot();
        let slots = resolve_slots(&snapshot, now_ms, &self.max_staleness);
        let bitmap = self.renderer.compose(&slots)?;

        if self.last_delivered.as_ref() == Some(&bitmap) {
            debug!("frame unchanged; skipping panel refresh");
            return Ok(RenderOutcome::Unchanged);
        }

        let frame = Frame::new(bitmap, snapshot.updated_at_ms);
        if self.sink.present(&frame) {
            self.last_delivered = Some(frame.bitmap);
            Ok(RenderOutcome::Delivered)
        } else {
            Ok(RenderOutcome::NotDelivered)
        }
    }

    /// Periodic render loop. Renders immediately after a short grace
    /// period for boot collection, then on every cadence tick.
    pub async fn run(mut self, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
        const STARTUP_GRACE: Duration = Duration::from_secs(45);

        tokio::select! {
            _ = tokio::time::sleep(STARTUP_GRACE.min(interval)) => {}
            _ = stop_rx.changed() => return,
        }

        loop {
            match self.render_once(unix_time_ms()) {
                Ok(outcome) => info!(?outcome, "render cycle finished"),
                // Retried next cadence; the previous image stays up.
                Err(err) => warn!(error = %err, "render cycle skipped"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayDriver, DisplayError};
    use inkboard_types::Record;
    use serde_json::json;

    fn no_cutoffs() -> BTreeMap<SourceId, Option<Duration>> {
        SourceId::ALL.into_iter().map(|id| (id, None)).collect()
    }

    fn utf8(bitmap: &Bitmap) -> String {
        String::from_utf8(bitmap.data.clone()).unwrap()
    }

    #[test]
    fn empty_snapshot_renders_all_placeholders() {
        let snapshot = Snapshot::empty(0);
        let slots = resolve_slots(&snapshot, 1_000, &no_cutoffs());

        assert_eq!(slots.len(), SourceId::ALL.len());
        assert!(slots.values().all(|c| *c == SlotContent::Placeholder));

        let bitmap = GridRenderer::new().compose(&slots).unwrap();
        let text = utf8(&bitmap);
        assert_eq!(text.matches("no data yet").count(), SourceId::ALL.len());
    }

    #[test]
    fn stale_source_keeps_its_payload() {
        let mut snapshot = Snapshot::empty(0);
        // Fetched at t=1000 with ttl 500: at t=2000 the age is 2x ttl.
        snapshot.record_success(Record::new(SourceId::Weather, json!({"temp": 21}), 1_000, 500));
        snapshot.record_success(Record::new(SourceId::Rss, json!([{"title": "hi"}]), 1_900, 500));

        let slots = resolve_slots(&snapshot, 2_000, &no_cutoffs());

        assert_eq!(
            slots[&SourceId::Weather],
            SlotContent::Stale { payload: json!({"temp": 21}), age_ms: 1_000 }
        );
        assert!(matches!(slots[&SourceId::Rss], SlotContent::Ready { .. }));

        let text = utf8(&GridRenderer::new().compose(&slots).unwrap());
        assert!(text.contains("Weather (stale)"));
        assert!(text.contains("temp: 21"));
    }

    #[test]
    fn max_staleness_cutoff_demotes_to_placeholder() {
        let mut snapshot = Snapshot::empty(0);
        snapshot.record_success(Record::new(SourceId::Sensor, json!({"t": 1}), 1_000, 500));

        let mut cutoffs = no_cutoffs();
        cutoffs.insert(SourceId::Sensor, Some(Duration::from_millis(800)));

        // Age 600: past TTL, within cutoff.
        let slots = resolve_slots(&snapshot, 1_600, &cutoffs);
        assert!(matches!(slots[&SourceId::Sensor], SlotContent::Stale { .. }));

        // Age 900: past the cutoff.
        let slots = resolve_slots(&snapshot, 1_900, &cutoffs);
        assert_eq!(slots[&SourceId::Sensor], SlotContent::Placeholder);
    }

    #[test]
    fn composition_is_idempotent() {
        let mut snapshot = Snapshot::empty(0);
        snapshot.record_success(Record::new(
            SourceId::Bus,
            json!([{"route": "333", "destination": "City", "due": "10:05"}]),
            1_000,
            600_000,
        ));
        snapshot.record_failure(SourceId::Weather, "503", 2_000);

        let renderer = GridRenderer::new();
        let slots = resolve_slots(&snapshot, 3_000, &no_cutoffs());

        let a = renderer.compose(&slots).unwrap();
        let b = renderer.compose(&slots).unwrap();
        assert_eq!(a, b);
    }

    struct CountingDriver {
        draws: usize,
        fail: bool,
    }

    impl DisplayDriver for CountingDriver {
        fn draw(&mut self, _bitmap: &Bitmap) -> Result<(), DisplayError> {
            if self.fail {
                return Err(DisplayError::Io("nope".to_string()));
            }
            self.draws += 1;
            Ok(())
        }

        fn sleep(&mut self) {}
    }

    fn orchestrator(store: Arc<SnapshotStore>, fail: bool) -> RenderOrchestrator {
        RenderOrchestrator::new(
            store,
            Box::new(GridRenderer::new()),
            DisplaySink::new(Box::new(CountingDriver { draws: 0, fail })),
            no_cutoffs(),
        )
    }

    #[test]
    fn unchanged_snapshot_skips_the_refresh() {
        let store = Arc::new(SnapshotStore::in_memory(0));
        store.record_success(Record::new(SourceId::Weather, json!({"temp": 9}), 1_000, 600_000));

        let mut orchestrator = orchestrator(store, false);
        assert_eq!(orchestrator.render_once(2_000).unwrap(), RenderOutcome::Delivered);
        assert_eq!(orchestrator.render_once(3_000).unwrap(), RenderOutcome::Unchanged);
    }

    #[test]
    fn failed_delivery_leaves_no_trace() {
        let store = Arc::new(SnapshotStore::in_memory(0));
        let mut orchestrator = orchestrator(store, true);

        assert_eq!(orchestrator.render_once(1_000).unwrap(), RenderOutcome::NotDelivered);
        // The next cycle retries from scratch.
        assert_eq!(orchestrator.render_once(2_000).unwrap(), RenderOutcome::NotDelivered);
    }

    #[test]
    fn slot_content_changes_when_data_crosses_its_ttl() {
        let store = Arc::new(SnapshotStore::in_memory(0));
        store.record_success(Record::new(SourceId::Weather, json!({"temp": 9}), 1_000, 500));

        let mut orchestrator = orchestrator(store, false);
        assert_eq!(orchestrator.render_once(1_200).unwrap(), RenderOutcome::Delivered);
        // Crossing the TTL adds the stale marker, which is a new bitmap.
        assert_eq!(orchestrator.render_once(2_000).unwrap(), RenderOutcome::Delivered);
    }
}
