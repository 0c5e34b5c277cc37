//! The collection orchestrator.
//!
//! Each source runs as its own tokio task on its own cadence: fetch,
//! record the outcome, sleep, repeat. A slow or hung collector times out
//! and counts as a failure for that source alone; nothing a source does
//! can delay another source's cadence or the render loop.
//!
//! Retry backoff doubles the sleep once a source keeps failing, up to a
//! configured cap, and resets on the next success.

use std::sync::Arc;
use std::time::Duration;

use inkboard_collectors::Collector;
use inkboard_types::unix_time_ms;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SourceSettings;
use crate::store::SnapshotStore;

/// Largest failure streak that still doubles the delay. Beyond this the
/// cap has long since taken over; bounding the exponent avoids overflow.
const MAX_BACKOFF_EXP: u32 = 16;

/// Delay before the next fetch, given the failure streak after the last
/// attempt.
///
/// Failures below `backoff_after` keep the normal cadence; from there the
/// delay doubles per failure and is clamped to `backoff_cap`. With a 5 min
/// cadence, `backoff_after = 1` and a 1 h cap, consecutive failures
/// produce delays of 10, 20, 40, 60, 60, ... minutes.
pub fn retry_delay(settings: &SourceSettings, consecutive_failures: u32) -> Duration {
    if consecutive_failures < settings.backoff_after {
        return settings.poll_interval;
    }
    let exp = (consecutive_failures - settings.backoff_after + 1).min(MAX_BACKOFF_EXP);
    let backed_off = settings.poll_interval.saturating_mul(1u32 << exp);
    backed_off.min(settings.backoff_cap)
}

/// Run one fetch for one source and record the outcome.
///
/// Returns the source's failure streak after this attempt (0 on success),
/// which feeds [`retry_delay`].
pub async fn collect_once(
    collector: &dyn Collector,
    settings: &SourceSettings,
    store: &SnapshotStore,
) -> u32 {
    let source = collector.source();
    debug!(%source, "fetching");

    match tokio::time::timeout(settings.timeout, collector.fetch()).await {
        Ok(Ok(record)) => {
            info!(%source, payload_bytes = record.payload.to_string().len(), "fetch succeeded");
            store.record_success(record);
            0
        }
        Ok(Err(err)) => {
            let failures = store.record_failure(source, err.to_string(), unix_time_ms());
            warn!(%source, error = %err, failures, "fetch failed");
            failures
        }
        Err(_) => {
            let message = format!("fetch timed out after {:?}", settings.timeout);
            let failures = store.record_failure(source, message, unix_time_ms());
            warn!(%source, timeout = ?settings.timeout, failures, "fetch timed out");
            failures
        }
    }
}

/// Handle to the running collection tasks.
///
/// Dropping the handle leaves the tasks running; call
/// [`stop`](CollectionHandle::stop) for a graceful shutdown.
pub struct CollectionHandle {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl CollectionHandle {
    /// Signal every task to stop and wait for them to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Spawn one periodic collection task per source.
///
/// Every task fetches immediately on startup so a fresh boot populates
/// the panel without waiting out a full cadence.
pub fn spawn_all(
    collectors: Vec<(Arc<dyn Collector>, SourceSettings)>,
    store: Arc<SnapshotStore>,
) -> CollectionHandle {
    let (stop_tx, stop_rx) = watch::channel(false);

    let tasks = collectors
        .into_iter()
        .map(|(collector, settings)| {
            let store = store.clone();
            let mut stop_rx = stop_rx.clone();

            tokio::spawn(async move {
                loop {
                    let failures = collect_once(collector.as_ref(), &settings, &store).await;
                    let delay = retry_delay(&settings, failures);

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = stop_rx.changed() => {
                            if *stop_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
            })
        })
        .collect();

    CollectionHandle { stop_tx, tasks }
}

/// Fetch every source once, concurrently. Used by `--once` runs.
pub async fn run_once(
    collectors: Vec<(Arc<dyn Collector>, SourceSettings)>,
    store: Arc<SnapshotStore>,
) {
    let mut set = tokio::task::JoinSet::new();
    for (collector, settings) in collectors {
        let store = store.clone();
        set.spawn(async move {
            collect_once(collector.as_ref(), &settings, &store).await;
        });
    }
    while set.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkboard_collectors::FetchError;
    use inkboard_types::{Record, SourceId};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    fn settings(poll_secs: u64, backoff_after: u32, cap_secs: u64) -> SourceSettings {
        SourceSettings {
            enabled: true,
            poll_interval: Duration::from_secs(poll_secs),
            timeout: Duration::from_secs(5),
            ttl: Duration::from_secs(600),
            backoff_after,
            backoff_cap: Duration::from_secs(cap_secs),
            max_staleness: None,
            endpoint: None,
            api_key: None,
            stop_id: None,
            token: None,
            path: None,
            latitude: None,
            longitude: None,
            feeds: Vec::new(),
        }
    }

    /// Scripted collector: pops one result per fetch, then hangs forever.
    struct ScriptedCollector {
        source: SourceId,
        script: Mutex<VecDeque<Result<Record, FetchError>>>,
    }

    impl ScriptedCollector {
        fn new(
            source: SourceId,
            script: impl IntoIterator<Item = Result<Record, FetchError>>,
        ) -> Self {
            Self {
                source,
                script: Mutex::new(script.into_iter().collect()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Collector for ScriptedCollector {
        fn source(&self) -> SourceId {
            self.source
        }

        async fn fetch(&self) -> Result<Record, FetchError> {
            let next = self.script.lock().pop_front();
            match next {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }

    fn ok_record(source: SourceId) -> Result<Record, FetchError> {
        Ok(Record::new(source, json!({"ok": true}), 1_000, 600_000))
    }

    fn failed(message: &str) -> Result<Record, FetchError> {
        Err(FetchError::Http(message.to_string()))
    }

    #[test]
    fn backoff_follows_the_doubling_schedule() {
        // 5 min cadence, 1 h cap: 5, 10, 20, 40, then pinned at 60.
        let s = settings(300, 1, 3600);

        let minutes: Vec<u64> = (0..6)
            .map(|failures| retry_delay(&s, failures).as_secs() / 60)
            .collect();
        assert_eq!(minutes, vec![5, 10, 20, 40, 60, 60]);
    }

    #[test]
    fn backoff_waits_for_the_failure_threshold() {
        let s = settings(300, 3, 3600);
        assert_eq!(retry_delay(&s, 0), Duration::from_secs(300));
        assert_eq!(retry_delay(&s, 2), Duration::from_secs(300));
        assert_eq!(retry_delay(&s, 3), Duration::from_secs(600));
    }

    #[test]
    fn huge_failure_streaks_do_not_overflow() {
        let s = settings(300, 1, 3600);
        assert_eq!(retry_delay(&s, u32::MAX), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn success_resets_the_streak() {
        let store = SnapshotStore::in_memory(0);
        let collector = ScriptedCollector::new(
            SourceId::Weather,
            [failed("503"), failed("503"), ok_record(SourceId::Weather)],
        );
        let s = settings(300, 1, 3600);

        assert_eq!(collect_once(&collector, &s, &store).await, 1);
        assert_eq!(collect_once(&collector, &s, &store).await, 2);
        assert_eq!(collect_once(&collector, &s, &store).await, 0);

        let status = store.snapshot();
        assert!(status.status(SourceId::Weather).last_error.is_none());
    }

    #[tokio::test]
    async fn failures_keep_the_previous_success() {
        let store = SnapshotStore::in_memory(0);
        let s = settings(300, 1, 3600);

        let collector = ScriptedCollector::new(
            SourceId::Weather,
            [ok_record(SourceId::Weather), failed("503"), failed("503"), failed("503")],
        );

        for _ in 0..4 {
            collect_once(&collector, &s, &store).await;
        }

        let snapshot = store.snapshot();
        let weather = snapshot.status(SourceId::Weather);
        assert_eq!(weather.consecutive_failures, 3);
        assert_eq!(weather.last_success.as_ref().unwrap().fetched_at_ms, 1_000);
    }

    #[tokio::test]
    async fn one_failing_source_never_touches_another() {
        let store = SnapshotStore::in_memory(0);
        let s = settings(300, 1, 3600);

        let rss = ScriptedCollector::new(SourceId::Rss, [ok_record(SourceId::Rss)]);
        let bus = ScriptedCollector::new(SourceId::Bus, [failed("gateway down")]);

        collect_once(&rss, &s, &store).await;
        let rss_before = store.snapshot().status(SourceId::Rss).clone();

        collect_once(&bus, &s, &store).await;

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status(SourceId::Rss), &rss_before);
        assert_eq!(snapshot.status(SourceId::Bus).consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_fetch_times_out_as_a_failure() {
        let store = SnapshotStore::in_memory(0);
        let s = settings(300, 1, 3600);

        // Empty script: the first fetch hangs forever.
        let collector = ScriptedCollector::new(SourceId::Sensor, []);
        let failures = collect_once(&collector, &s, &store).await;

        assert_eq!(failures, 1);
        let snapshot = store.snapshot();
        let message = &snapshot.status(SourceId::Sensor).last_error.as_ref().unwrap().message;
        assert!(message.contains("timed out"));
    }

    #[tokio::test]
    async fn run_once_covers_every_collector() {
        let store = SnapshotStore::in_memory(0);
        let collectors: Vec<(Arc<dyn Collector>, SourceSettings)> = vec![
            (
                Arc::new(ScriptedCollector::new(SourceId::Rss, [ok_record(SourceId::Rss)])),
                settings(300, 1, 3600),
            ),
            (
                Arc::new(ScriptedCollector::new(SourceId::Bus, [failed("503")])),
                settings(300, 1, 3600),
            ),
        ];

        let store = Arc::new(store);
        run_once(collectors, store.clone()).await;

        let snapshot = store.snapshot();
        assert!(snapshot.status(SourceId::Rss).last_success.is_some());
        assert_eq!(snapshot.status(SourceId::Bus).consecutive_failures, 1);
    }
}
