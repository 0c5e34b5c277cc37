//! Sensor collector reading a local file written by a sensor daemon.
//!
//! The indoor climate sensor is wired to a separate process that drops its
//! latest reading as JSON (e.g. `{"temp_c": 21.4, "humidity_pct": 58}`).
//! This collector just reads and validates that file; no network involved.

use std::path::{Path, PathBuf};

use inkboard_types::{unix_time_ms, Record, SourceId};

use crate::{Collector, FetchError};

/// Collector for local sensor readings.
#[derive(Debug, Clone)]
pub struct SensorCollector {
    path: PathBuf,
    ttl_ms: u64,
}

impl SensorCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> SensorCollectorBuilder {
        SensorCollectorBuilder::default()
    }

    /// The file being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Collector for SensorCollector {
    fn source(&self) -> SourceId {
        SourceId::Sensor
    }

    async fn fetch(&self) -> Result<Record, FetchError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let payload: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| FetchError::Parse(e.to_string()))?;

        if !payload.is_object() {
            return Err(FetchError::Payload(
                "sensor file must contain a JSON object".to_string(),
            ));
        }

        Ok(Record::new(
            SourceId::Sensor,
            payload,
            unix_time_ms(),
            self.ttl_ms,
        ))
    }
}

/// Builder for [`SensorCollector`].
#[derive(Debug, Default)]
pub struct SensorCollectorBuilder {
    path: Option<PathBuf>,
    ttl_ms: Option<u64>,
}

impl SensorCollectorBuilder {
    /// Set the reading file path.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// How long a reading stays fresh (default: 10 minutes).
    pub fn ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    /// Build the collector.
    pub fn build(self) -> SensorCollector {
        SensorCollector {
            path: self
                .path
                .unwrap_or_else(|| PathBuf::from("/run/inkboard/sensor.json")),
            ttl_ms: self.ttl_ms.unwrap_or(10 * 60 * 1000),
        }
    }
}
