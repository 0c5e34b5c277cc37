//! Configuration loading and validation.
//!
//! Settings come from a TOML file layered with `INKBOARD_`-prefixed
//! environment variables. Durations are written as humane strings
//! ("15s", "5m", "1h") and validated up front, so every cadence the
//! orchestrators see is already a [`Duration`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use inkboard_types::SourceId;
use serde::Deserialize;

/// Suffix to milliseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("s", 1_000.0),
    ("m", 60_000.0),
    ("h", 3_600_000.0),
];

/// Parse cadence strings like "90s", "7.5m", "1h", "250ms".
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if val < 0.0 {
                bail!("Duration cannot be negative: {}", s);
            }
            return Ok(Duration::from_millis((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {} (expected e.g. \"30s\", \"5m\", \"1h\")", s)
}

/// Fully validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where the snapshot state file lives.
    pub state_path: PathBuf,
    /// Where the simulator driver writes frames.
    pub frame_path: PathBuf,
    /// Render cadence, coarser than collection.
    pub render_interval: Duration,
    /// Local offset from UTC in minutes, for formatting feed times.
    pub utc_offset_minutes: i32,
    /// Per-source settings; every known source has an entry.
    pub sources: BTreeMap<SourceId, SourceSettings>,
}

/// Validated per-source settings.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Disabled sources are never scheduled and render as placeholders.
    pub enabled: bool,
    /// How often to fetch when healthy.
    pub poll_interval: Duration,
    /// Deadline for one fetch; expiry counts as a failure.
    pub timeout: Duration,
    /// How long a successful fetch stays fresh.
    pub ttl: Duration,
    /// Failures tolerated at the normal cadence before backoff starts.
    pub backoff_after: u32,
    /// Ceiling for the backed-off retry interval.
    pub backoff_cap: Duration,
    /// Optional cutoff after which stale data degrades to a placeholder.
    /// Absent means stale data is shown indefinitely.
    pub max_staleness: Option<Duration>,

    // Feed-specific knobs; which ones apply depends on the source.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub stop_id: Option<String>,
    pub token: Option<String>,
    pub path: Option<PathBuf>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub feeds: Vec<FeedConfig>,
}

/// One RSS feed entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Raw deserialized file contents, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    state_path: Option<String>,
    #[serde(default)]
    frame_path: Option<String>,
    #[serde(default)]
    render_interval: Option<String>,
    #[serde(default)]
    utc_offset_minutes: Option<i32>,
    #[serde(default)]
    sources: BTreeMap<String, RawSourceConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSourceConfig {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    poll_interval: Option<String>,
    #[serde(default)]
    timeout: Option<String>,
    #[serde(default)]
    ttl: Option<String>,
    #[serde(default)]
    backoff_after: Option<u32>,
    #[serde(default)]
    backoff_cap: Option<String>,
    #[serde(default)]
    max_staleness: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    stop_id: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    feeds: Vec<FeedConfig>,
}

/// Load and validate settings.
///
/// With an explicit path the file must exist; without one, a local
/// `inkboard.toml` is used when present and defaults apply otherwise.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let mut builder = config::Config::builder();
    builder = match path {
        Some(path) => builder.add_source(config::File::from(path.to_path_buf())),
        None => builder.add_source(config::File::with_name("inkboard").required(false)),
    };
    builder = builder.add_source(
        config::Environment::with_prefix("INKBOARD")
            .separator("__")
            .try_parsing(true),
    );

    let raw: RawConfig = builder
        .build()
        .context("reading configuration")?
        .try_deserialize()
        .context("deserializing configuration")?;

    resolve(raw)
}

/// Per-source cadence defaults. Fast-changing feeds poll more often.
fn default_cadence(id: SourceId) -> (Duration, Duration) {
    // (poll_interval, ttl)
    match id {
        SourceId::Bus => (Duration::from_secs(5 * 60), Duration::from_secs(10 * 60)),
        SourceId::Sensor => (Duration::from_secs(5 * 60), Duration::from_secs(10 * 60)),
        SourceId::Reminders => (Duration::from_secs(10 * 60), Duration::from_secs(30 * 60)),
        SourceId::Calendar | SourceId::Rss | SourceId::Weather => {
            (Duration::from_secs(15 * 60), Duration::from_secs(45 * 60))
        }
    }
}

fn resolve(raw: RawConfig) -> Result<Settings> {
    let mut raw_sources = raw.sources;
    for name in raw_sources.keys() {
        if name.parse::<SourceId>().is_err() {
            bail!("unknown source in config: {}", name);
        }
    }

    let mut sources = BTreeMap::new();
    for id in SourceId::ALL {
        let raw = raw_sources.remove(id.as_str()).unwrap_or_default();
        let (default_poll, default_ttl) = default_cadence(id);

        let parse = |field: &str, value: &Option<String>, default: Duration| -> Result<Duration> {
            match value {
                Some(s) => parse_duration(s).with_context(|| format!("sources.{}.{}", id, field)),
                None => Ok(default),
            }
        };

        sources.insert(
            id,
            SourceSettings {
                enabled: raw.enabled.unwrap_or(true),
                poll_interval: parse("poll_interval", &raw.poll_interval, default_poll)?,
                timeout: parse("timeout", &raw.timeout, Duration::from_secs(15))?,
                ttl: parse("ttl", &raw.ttl, default_ttl)?,
                backoff_after: raw.backoff_after.unwrap_or(1),
                backoff_cap: parse("backoff_cap", &raw.backoff_cap, Duration::from_secs(3600))?,
                max_staleness: raw
                    .max_staleness
                    .as_ref()
                    .map(|s| parse_duration(s).with_context(|| format!("sources.{}.max_staleness", id)))
                    .transpose()?,
                endpoint: raw.endpoint,
                api_key: raw.api_key,
                stop_id: raw.stop_id,
                token: raw.token,
                path: raw.path.map(PathBuf::from),
                latitude: raw.latitude,
                longitude: raw.longitude,
                feeds: raw.feeds,
            },
        );
    }

    let render_interval = match &raw.render_interval {
        Some(s) => parse_duration(s).context("render_interval")?,
        None => Duration::from_secs(20 * 60),
    };

    Ok(Settings {
        state_path: PathBuf::from(raw.state_path.unwrap_or_else(|| "inkboard-state.json".into())),
        frame_path: PathBuf::from(raw.frame_path.unwrap_or_else(|| "inkboard-frame.txt".into())),
        render_interval,
        utc_offset_minutes: raw.utc_offset_minutes.unwrap_or(0),
        sources,
    })
}
