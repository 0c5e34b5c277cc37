//! Wiring from validated settings to concrete collectors.
//!
//! A source that is disabled, or missing config it cannot run without,
//! simply gets no collector: its slot renders the placeholder and the
//! rest of the dashboard is unaffected.

use std::sync::Arc;

use inkboard_collectors::{
    CalendarCollector, Collector, RemindersCollector, RssCollector, SensorCollector,
    TransitCollector, WeatherCollector,
};
use inkboard_types::SourceId;
use tracing::warn;

use crate::config::{Settings, SourceSettings};

fn ttl_ms(settings: &SourceSettings) -> u64 {
    settings.ttl.as_millis() as u64
}

fn build_one(
    id: SourceId,
    settings: &SourceSettings,
    utc_offset_minutes: i32,
) -> Option<Arc<dyn Collector>> {
    match id {
        SourceId::Weather => {
            let mut builder = WeatherCollector::builder()
                .ttl_ms(ttl_ms(settings))
                .timeout(settings.timeout);
            if let Some(endpoint) = &settings.endpoint {
                builder = builder.endpoint(endpoint);
            }
            if let (Some(lat), Some(lon)) = (settings.latitude, settings.longitude) {
                builder = builder.coordinates(lat, lon);
            }
            Some(Arc::new(builder.build()))
        }
        SourceId::Bus => {
            let (Some(stop_id), Some(api_key)) = (&settings.stop_id, &settings.api_key) else {
                warn!(source = %id, "missing stop_id/api_key; source will show a placeholder");
                return None;
            };
            let mut builder = TransitCollector::builder()
                .stop_id(stop_id)
                .api_key(api_key)
                .utc_offset_minutes(utc_offset_minutes)
                .ttl_ms(ttl_ms(settings))
                .timeout(settings.timeout);
            if let Some(endpoint) = &settings.endpoint {
                builder = builder.endpoint(endpoint);
            }
            Some(Arc::new(builder.build()))
        }
        SourceId::Rss => {
            let mut builder = RssCollector::builder()
                .ttl_ms(ttl_ms(settings))
                .timeout(settings.timeout);
            if settings.feeds.is_empty() {
                builder = builder
                    .feed("ABC", "https://www.abc.net.au/news/feed/51120/rss.xml")
                    .feed("Gdn", "https://www.theguardian.com/au/rss");
            } else {
                for feed in &settings.feeds {
                    builder = builder.feed(&feed.name, &feed.url);
                }
            }
            Some(Arc::new(builder.build()))
        }
        SourceId::Calendar => {
            let Some(url) = &settings.endpoint else {
                warn!(source = %id, "no ICS url configured; source will show a placeholder");
                return None;
            };
            Some(Arc::new(
                CalendarCollector::builder()
                    .url(url)
                    .utc_offset_minutes(utc_offset_minutes)
                    .ttl_ms(ttl_ms(settings))
                    .timeout(settings.timeout)
                    .build(),
            ))
        }
        SourceId::Reminders => {
            let mut builder = RemindersCollector::builder()
                .ttl_ms(ttl_ms(settings))
                .timeout(settings.timeout);
            if let Some(endpoint) = &settings.endpoint {
                builder = builder.endpoint(endpoint);
            }
            if let Some(token) = &settings.token {
                builder = builder.token(token);
            }
            Some(Arc::new(builder.build()))
        }
        SourceId::Sensor => {
            let mut builder = SensorCollector::builder().ttl_ms(ttl_ms(settings));
            if let Some(path) = &settings.path {
                builder = builder.path(path);
            }
            Some(Arc::new(builder.build()))
        }
    }
}

/// Build a collector for every enabled, runnable source.
pub fn build_collectors(settings: &Settings) -> Vec<(Arc<dyn Collector>, SourceSettings)> {
    let mut collectors = Vec::new();
    for (id, source) in &settings.sources {
        if !source.enabled {
            continue;
        }
        if let Some(collector) = build_one(*id, source, settings.utc_offset_minutes) {
            collectors.push((collector, source.clone()));
        }
    }
    collectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn default_settings() -> Settings {
        config::load(None).unwrap()
    }

    #[test]
    fn unconfigured_bus_and_calendar_are_skipped() {
        let settings = default_settings();
        let collectors = build_collectors(&settings);

        let built: Vec<SourceId> = collectors.iter().map(|(c, _)| c.source()).collect();
        assert!(!built.contains(&SourceId::Bus));
        assert!(!built.contains(&SourceId::Calendar));
        assert!(built.contains(&SourceId::Weather));
        assert!(built.contains(&SourceId::Rss));
        assert!(built.contains(&SourceId::Sensor));
    }

    #[test]
    fn disabled_sources_are_skipped() {
        let mut settings = default_settings();
        settings.sources.get_mut(&SourceId::Rss).unwrap().enabled = false;

        let built: Vec<SourceId> = build_collectors(&settings)
            .iter()
            .map(|(c, _)| c.source())
            .collect();
        assert!(!built.contains(&SourceId::Rss));
    }

    #[test]
    fn configured_bus_is_built() {
        let mut settings = default_settings();
        {
            let bus = settings.sources.get_mut(&SourceId::Bus).unwrap();
            bus.stop_id = Some("206663".to_string());
            bus.api_key = Some("key".to_string());
        }

        let built: Vec<SourceId> = build_collectors(&settings)
            .iter()
            .map(|(c, _)| c.source())
            .collect();
        assert!(built.contains(&SourceId::Bus));
    }
}
