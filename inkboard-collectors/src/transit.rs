//! Transit collector for a departure-monitor API.
//!
//! Queries a stop-monitor endpoint (TfNSW-style: API key in an
//! `Authorization: apikey ...` header, stop id as a query parameter) and
//! keeps the next few upcoming departures. Departures whose estimated time
//! has already passed are skipped.

use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use inkboard_types::{unix_time_ms, Record, SourceId};

use crate::{Collector, FetchError};

const MAX_DEPARTURES: usize = 4;
const MAX_DESTINATION_LEN: usize = 15;

/// Collector for upcoming departures from one transit stop.
#[derive(Debug, Clone)]
pub struct TransitCollector {
    client: Client,
    endpoint: String,
    stop_id: String,
    api_key: String,
    utc_offset_minutes: i32,
    ttl_ms: u64,
}

impl TransitCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> TransitCollectorBuilder {
        TransitCollectorBuilder::default()
    }

    async fn fetch_events(&self) -> Result<Vec<StopEvent>, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Authorization", format!("apikey {}", self.api_key))
            .query(&[
                ("outputFormat", "rapidJSON"),
                ("mode", "direct"),
                ("type_dm", "stop"),
                ("name_dm", self.stop_id.as_str()),
                ("depArrMacro", "dep"),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Auth("API key rejected".to_string()));
        }
        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let body: DepartureResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(body.stop_events)
    }
}

#[async_trait::async_trait]
impl Collector for TransitCollector {
    fn source(&self) -> SourceId {
        SourceId::Bus
    }

    async fn fetch(&self) -> Result<Record, FetchError> {
        let events = self.fetch_events().await?;
        let payload = departures_from(&events, Utc::now(), self.utc_offset_minutes);
        Ok(Record::new(
            SourceId::Bus,
            payload,
            unix_time_ms(),
            self.ttl_ms,
        ))
    }
}

/// Builder for [`TransitCollector`].
#[derive(Debug, Default)]
pub struct TransitCollectorBuilder {
    endpoint: Option<String>,
    stop_id: Option<String>,
    api_key: Option<String>,
    utc_offset_minutes: Option<i32>,
    ttl_ms: Option<u64>,
    timeout: Option<Duration>,
}

impl TransitCollectorBuilder {
    /// Set the departure-monitor endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the stop to monitor.
    pub fn stop_id(mut self, stop_id: impl Into<String>) -> Self {
        self.stop_id = Some(stop_id.into());
        self
    }

    /// Set the API key sent in the Authorization header.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Local offset from UTC in minutes, used to format departure times
    /// (default: 0, i.e. UTC).
    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = Some(minutes);
        self
    }

    /// How long a fetched departure board stays fresh (default: 5 minutes).
    pub fn ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    /// Set the request timeout (default: 15 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the collector.
    pub fn build(self) -> TransitCollector {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(15));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        TransitCollector {
            client,
            endpoint: self.endpoint.unwrap_or_else(|| {
                "https://api.transport.nsw.gov.au/v1/tp/departure_mon".to_string()
            }),
            stop_id: self.stop_id.unwrap_or_default(),
            api_key: self.api_key.unwrap_or_default(),
            utc_offset_minutes: self.utc_offset_minutes.unwrap_or(0),
            ttl_ms: self.ttl_ms.unwrap_or(5 * 60 * 1000),
        }
    }
}

/// Shape stop events into the departure-board payload.
///
/// Estimated times are preferred over planned ones; events without either,
/// with unparseable times, or already departed are dropped. The board is
/// capped at [`MAX_DEPARTURES`] rows.
fn departures_from(
    events: &[StopEvent],
    now: DateTime<Utc>,
    utc_offset_minutes: i32,
) -> serde_json::Value {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));

    let mut rows = Vec::new();
    for event in events {
        let time_str = match event
            .departure_time_estimated
            .as_deref()
            .or(event.departure_time_planned.as_deref())
        {
            Some(s) => s,
            None => continue,
        };
        let departs = match DateTime::parse_from_rfc3339(time_str) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(_) => continue,
        };
        if departs < now {
            continue;
        }

        let destination: String = event
            .transportation
            .destination
            .name
            .split(',')
            .next()
            .unwrap_or("")
            .chars()
            .take(MAX_DESTINATION_LEN)
            .collect();

        rows.push(json!({
            "route": event.transportation.number,
            "destination": destination,
            "due": departs.with_timezone(&offset).format("%H:%M").to_string(),
        }));
        if rows.len() == MAX_DEPARTURES {
            break;
        }
    }

    json!(rows)
}

#[derive(Debug, Deserialize)]
struct DepartureResponse {
    #[serde(default, rename = "stopEvents")]
    stop_events: Vec<StopEvent>,
}

#[derive(Debug, Deserialize)]
struct StopEvent {
    #[serde(rename = "departureTimeEstimated")]
    departure_time_estimated: Option<String>,
    #[serde(rename = "departureTimePlanned")]
    departure_time_planned: Option<String>,
    transportation: Transportation,
}

#[derive(Debug, Deserialize)]
struct Transportation {
    number: String,
    destination: Destination,
}

#[derive(Debug, Deserialize)]
struct Destination {
    name: String,
}
