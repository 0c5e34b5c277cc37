//! Weather collector using the Open-Meteo forecast API.
//!
//! Open-Meteo needs no API key; the request carries only coordinates. The
//! payload keeps the handful of fields the weather slot displays: rounded
//! temperature, a condition word decoded from the WMO weather code, and
//! wind as speed plus a compass direction.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use inkboard_types::{unix_time_ms, Record, SourceId};

use crate::{Collector, FetchError};

/// Collector for current weather conditions.
#[derive(Debug, Clone)]
pub struct WeatherCollector {
    client: Client,
    endpoint: String,
    latitude: f64,
    longitude: f64,
    ttl_ms: u64,
}

impl WeatherCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> WeatherCollectorBuilder {
        WeatherCollectorBuilder::default()
    }

    async fn fetch_current(&self) -> Result<CurrentWeather, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("current_weather", "true".to_string()),
                ("temperature_unit", "celsius".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        body.current_weather
            .ok_or_else(|| FetchError::Payload("response has no current_weather block".into()))
    }
}

#[async_trait::async_trait]
impl Collector for WeatherCollector {
    fn source(&self) -> SourceId {
        SourceId::Weather
    }

    async fn fetch(&self) -> Result<Record, FetchError> {
        let current = self.fetch_current().await?;
        Ok(Record::new(
            SourceId::Weather,
            payload_from(&current),
            unix_time_ms(),
            self.ttl_ms,
        ))
    }
}

/// Builder for [`WeatherCollector`].
#[derive(Debug, Default)]
pub struct WeatherCollectorBuilder {
    endpoint: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    ttl_ms: Option<u64>,
    timeout: Option<Duration>,
}

impl WeatherCollectorBuilder {
    /// Override the API endpoint (useful for tests and proxies).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the location to forecast.
    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// How long a fetched reading stays fresh (default: 30 minutes).
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
    pub fn build(self) -> WeatherCollector {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(15));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        WeatherCollector {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| "https://api.open-meteo.com/v1/forecast".to_string()),
            latitude: self.latitude.unwrap_or(-33.8688),
            longitude: self.longitude.unwrap_or(151.2093),
            ttl_ms: self.ttl_ms.unwrap_or(30 * 60 * 1000),
        }
    }
}

fn payload_from(current: &CurrentWeather) -> serde_json::Value {
    let (condition, description) = describe_wmo_code(current.weathercode);
    json!({
        "temp": current.temperature.round() as i64,
        "condition": condition,
        "description": description,
        "wind_kmh": current.windspeed.round() as i64,
        "wind_dir": compass_direction(current.winddirection),
    })
}

/// Map a WMO weather code to a short condition word and a description.
fn describe_wmo_code(code: u16) -> (&'static str, &'static str) {
    match code {
        0 => ("Clear", "Clear sky"),
        1 => ("Clear", "Mainly clear"),
        2 => ("Cloudy", "Partly cloudy"),
        3 => ("Cloudy", "Overcast"),
        45 | 48 => ("Fog", "Foggy"),
        51 | 53 | 55 => ("Drizzle", "Drizzle"),
        61 => ("Rain", "Light rain"),
        63 => ("Rain", "Rain"),
        65 => ("Rain", "Heavy rain"),
        71 => ("Snow", "Light snow"),
        73 => ("Snow", "Snow"),
        75 => ("Snow", "Heavy snow"),
        95 | 96 | 99 => ("Storm", "Thunderstorm"),
        _ => ("Unknown", "Unknown"),
    }
}

/// 16-point compass direction from degrees.
fn compass_direction(degrees: f64) -> &'static str {
    const DIRECTIONS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let idx = (degrees / 22.5).round() as usize % 16;
    DIRECTIONS[idx]
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

/// Current conditions block from the Open-Meteo response.
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    #[serde(default)]
    windspeed: f64,
    #[serde(default)]
    winddirection: f64,
    #[serde(default)]
    weathercode: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let collector = WeatherCollector::builder().build();
        assert_eq!(collector.endpoint, "https://api.open-meteo.com/v1/forecast");
        assert_eq!(collector.ttl_ms, 30 * 60 * 1000);
    }

    #[test]
    fn test_payload_shape() {
        let current = CurrentWeather {
            temperature: 18.6,
            windspeed: 22.3,
            winddirection: 180.0,
            weathercode: 63,
        };

        let payload = payload_from(&current);
        assert_eq!(payload["temp"], 19);
        assert_eq!(payload["condition"], "Rain");
        assert_eq!(payload["description"], "Rain");
        assert_eq!(payload["wind_kmh"], 22);
        assert_eq!(payload["wind_dir"], "S");
    }

    #[test]
    fn test_compass_direction() {
        assert_eq!(compass_direction(0.0), "N");
        assert_eq!(compass_direction(90.0), "E");
        assert_eq!(compass_direction(359.0), "N");
        assert_eq!(compass_direction(202.5), "SSW");
    }

    #[test]
    fn test_unknown_wmo_code() {
        assert_eq!(describe_wmo_code(42), ("Unknown", "Unknown"));
    }

    #[test]
    fn test_response_without_current_block_parses() {
        let body: ForecastResponse = serde_json::from_str("{}").unwrap();
        assert!(body.current_weather.is_none());
    }
}
