//! The closed set of known data feeds.

use std::fmt;
use std::str::FromStr;

/// Identifier for one of the dashboard's data feeds.
///
/// This is a fixed, closed set: adding a feed means adding a variant here
/// and wiring a collector for it. Snapshots always carry one entry per
/// variant, so downstream code can index by `SourceId` without checking
/// for missing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Upcoming events from an ICS calendar feed.
    Calendar,
    /// Open items from a task/reminders endpoint.
    Reminders,
    /// Next departures from a transit stop monitor.
    Bus,
    /// Lead headlines from RSS feeds.
    Rss,
    /// Current conditions from a weather API.
    Weather,
    /// Readings from a local sensor daemon.
    Sensor,
}

impl SourceId {
    /// Every known source, in layout order.
    pub const ALL: [SourceId; 6] = [
        SourceId::Calendar,
        SourceId::Reminders,
        SourceId::Bus,
        SourceId::Rss,
        SourceId::Weather,
        SourceId::Sensor,
    ];

    /// The lowercase name used as the persisted map key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Calendar => "calendar",
            SourceId::Reminders => "reminders",
            SourceId::Bus => "bus",
            SourceId::Rss => "rss",
            SourceId::Weather => "weather",
            SourceId::Sensor => "sensor",
        }
    }

    /// Human-readable title for display slots.
    pub fn title(&self) -> &'static str {
        match self {
            SourceId::Calendar => "Calendar",
            SourceId::Reminders => "Reminders",
            SourceId::Bus => "Departures",
            SourceId::Rss => "News",
            SourceId::Weather => "Weather",
            SourceId::Sensor => "Indoor",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// Error returned when parsing a source name that is not in the known set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source: {}", self.0)
    }
}

impl std::error::Error for UnknownSource {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_covers_every_variant_exactly_once() {
        let mut names: Vec<&str> = SourceId::ALL.iter().map(|s| s.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SourceId::ALL.len());
    }

    #[test]
    fn round_trips_through_str() {
        for id in SourceId::ALL {
            assert_eq!(id.as_str().parse::<SourceId>().unwrap(), id);
        }
        assert!("tides".parse::<SourceId>().is_err());
    }

    #[test]
    fn serializes_as_lowercase_string() {
        let json = serde_json::to_string(&SourceId::Weather).unwrap();
        assert_eq!(json, "\"weather\"");
        let parsed: SourceId = serde_json::from_str("\"bus\"").unwrap();
        assert_eq!(parsed, SourceId::Bus);
    }
}
