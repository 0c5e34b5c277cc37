//! # inkboard-collectors
//!
//! One collector per dashboard feed. Each collector is a pure fetch: it
//! makes its outbound call, shapes the response into a source-specific
//! JSON payload, and returns a [`Record`] stamped with the fetch time and
//! the source's TTL. Collectors hold no shared state and contain no retry
//! logic; scheduling, timeouts, and backoff belong to the orchestrator.
//!
//! ## Example
//!
//! ```rust,no_run
//! use inkboard_collectors::{Collector, WeatherCollector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector = WeatherCollector::builder()
//!         .coordinates(-33.8688, 151.2093)
//!         .ttl_ms(30 * 60 * 1000)
//!         .build();
//!
//!     let record = collector.fetch().await?;
//!     println!("{}", serde_json::to_string_pretty(&record.payload)?);
//!     Ok(())
//! }
//! ```

mod calendar;
mod error;
mod reminders;
mod rss_feed;
mod sensor;
mod transit;
mod weather;

pub use calendar::{CalendarCollector, CalendarCollectorBuilder};
pub use error::FetchError;
pub use reminders::{RemindersCollector, RemindersCollectorBuilder};
pub use rss_feed::{RssCollector, RssCollectorBuilder};
pub use sensor::{SensorCollector, SensorCollectorBuilder};
pub use transit::{TransitCollector, TransitCollectorBuilder};
pub use weather::{WeatherCollector, WeatherCollectorBuilder};

use async_trait::async_trait;
use inkboard_types::{Record, SourceId};

/// A unit that fetches one external data source.
///
/// Implementations must not mutate shared state and must map ordinary
/// network/API failures to [`FetchError`] rather than panicking. The
/// orchestrator bounds every call with its own timeout, so a well-behaved
/// collector does not need one, though the HTTP collectors here set a
/// client-level timeout anyway so a wedged connection fails with a precise
/// error instead of a generic deadline.
#[async_trait]
pub trait Collector: Send + Sync {
    /// The source this collector owns.
    fn source(&self) -> SourceId;

    /// Fetch the feed once.
    async fn fetch(&self) -> Result<Record, FetchError>;
}
