//! Calendar collector for an ICS feed.
//!
//! Fetches a published iCalendar URL (Google/iCloud secret address style),
//! keeps upcoming events only, and shapes them for the calendar slot:
//! short date, start-end time or "All Day", and a truncated summary.
//!
//! Floating and TZID-qualified times are interpreted at the configured
//! local offset; this dashboard does not carry a timezone database.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, EventLike};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use inkboard_types::{unix_time_ms, Record, SourceId};

use crate::{Collector, FetchError};

const MAX_EVENTS: usize = 4;
const MAX_SUMMARY_LEN: usize = 22;

/// Collector for upcoming events from one ICS calendar.
#[derive(Debug, Clone)]
pub struct CalendarCollector {
    client: Client,
    url: String,
    utc_offset_minutes: i32,
    ttl_ms: u64,
}

impl CalendarCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> CalendarCollectorBuilder {
        CalendarCollectorBuilder::default()
    }
}

#[async_trait::async_trait]
impl Collector for CalendarCollector {
    fn source(&self) -> SourceId {
        SourceId::Calendar
    }

    async fn fetch(&self) -> Result<Record, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "calendar returned status {}",
                response.status()
            )));
        }
        let text = response.text().await?;
        let payload = upcoming_events(&text, Utc::now(), self.utc_offset_minutes)?;

        Ok(Record::new(
            SourceId::Calendar,
            payload,
            unix_time_ms(),
            self.ttl_ms,
        ))
    }
}

/// Builder for [`CalendarCollector`].
#[derive(Debug, Default)]
pub struct CalendarCollectorBuilder {
    url: Option<String>,
    utc_offset_minutes: Option<i32>,
    ttl_ms: Option<u64>,
    timeout: Option<Duration>,
}

impl CalendarCollectorBuilder {
    /// Set the ICS feed URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Local offset from UTC in minutes (default: 0).
    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = Some(minutes);
        self
    }

    /// How long a fetched agenda stays fresh (default: 30 minutes).
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
    pub fn build(self) -> CalendarCollector {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(15));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        CalendarCollector {
            client,
            url: self.url.unwrap_or_default(),
            utc_offset_minutes: self.utc_offset_minutes.unwrap_or(0),
            ttl_ms: self.ttl_ms.unwrap_or(30 * 60 * 1000),
        }
    }
}

struct UpcomingEvent {
    starts: DateTime<Utc>,
    date: String,
    time: String,
    summary: String,
}

/// Parse an ICS body and keep the next few upcoming events.
fn upcoming_events(
    ics: &str,
    now: DateTime<Utc>,
    utc_offset_minutes: i32,
) -> Result<serde_json::Value, FetchError> {
    let calendar: Calendar = ics.parse().map_err(FetchError::Parse)?;
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));

    let mut events = Vec::new();
    for component in &calendar.components {
        let event = match component {
            CalendarComponent::Event(event) => event,
            _ => continue,
        };
        let summary = event.get_summary().unwrap_or("(untitled)");
        let start = match event.get_start() {
            Some(start) => start,
            None => continue,
        };

        let (starts, all_day) = match resolve(start, offset) {
            Some(resolved) => resolved,
            None => continue,
        };
        if starts <= now {
            continue;
        }

        let local_start = starts.with_timezone(&offset);
        let time = if all_day {
            "All Day".to_string()
        } else {
            let mut time = format_clock(&local_start);
            if let Some((end, false)) = event.get_end().and_then(|e| resolve(e, offset)) {
                time.push_str(" - ");
                time.push_str(&format_clock(&end.with_timezone(&offset)));
            }
            time
        };

        events.push(UpcomingEvent {
            starts,
            date: local_start.format("%a %d/%m").to_string(),
            time,
            summary: shorten(summary),
        });
    }

    events.sort_by_key(|e| e.starts);
    events.truncate(MAX_EVENTS);

    Ok(json!(events
        .iter()
        .map(|e| json!({"date": e.date, "time": e.time, "summary": e.summary}))
        .collect::<Vec<_>>()))
}

/// Resolve an ICS start/end into UTC, flagging all-day dates.
fn resolve(when: DatePerhapsTime, offset: FixedOffset) -> Option<(DateTime<Utc>, bool)> {
    match when {
        DatePerhapsTime::Date(date) => {
            let midnight = date.and_hms_opt(0, 0, 0)?;
            Some((local_to_utc(midnight, offset)?, true))
        }
        DatePerhapsTime::DateTime(dt) => match dt {
            CalendarDateTime::Utc(utc) => Some((utc, false)),
            CalendarDateTime::Floating(naive) => Some((local_to_utc(naive, offset)?, false)),
            // No tz database here; read the wall-clock time at the local offset.
            CalendarDateTime::WithTimezone { date_time, .. } => {
                Some((local_to_utc(date_time, offset)?, false))
            }
        },
    }
}

fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// "9:05am" style clock, no leading zero on the hour.
fn format_clock(dt: &DateTime<FixedOffset>) -> String {
    let formatted = dt.format("%I:%M%P").to_string();
    formatted.trim_start_matches('0').to_string()
}

fn shorten(summary: &str) -> String {
    if summary.chars().count() > MAX_SUMMARY_LEN {
        let head: String = summary.chars().take(MAX_SUMMARY_LEN - 2).collect();
        format!("{}..", head)
    } else {
        summary.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ics(body: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n{}END:VCALENDAR\r\n",
            body
        )
    }

    fn vevent(uid: &str, summary: &str, dtstart_line: &str) -> String {
        format!(
            "BEGIN:VEVENT\r\nUID:{}\r\nDTSTAMP:20250101T000000Z\r\nSUMMARY:{}\r\n{}\r\nEND:VEVENT\r\n",
            uid, summary, dtstart_line
        )
    }

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn keeps_only_future_events_sorted() {
        let body = format!(
            "{}{}{}",
            vevent("a", "Past standup", "DTSTART:20250601T080000Z"),
            vevent("b", "Dentist", "DTSTART:20250603T090000Z"),
            vevent("c", "Lunch", "DTSTART:20250602T120000Z"),
        );

        let payload = upcoming_events(&ics(&body), at(2025, 6, 1, 12), 0).unwrap();
        let rows = payload.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["summary"], "Lunch");
        assert_eq!(rows[1]["summary"], "Dentist");
    }

    #[test]
    fn all_day_events_are_labelled() {
        let body = vevent("a", "Public holiday", "DTSTART;VALUE=DATE:20250602");
        let payload = upcoming_events(&ics(&body), at(2025, 6, 1, 0), 0).unwrap();
        assert_eq!(payload[0]["time"], "All Day");
    }

    #[test]
    fn long_summaries_are_truncated() {
        let body = vevent(
            "a",
            "Quarterly planning session with the whole team",
            "DTSTART:20250602T090000Z",
        );
        let payload = upcoming_events(&ics(&body), at(2025, 6, 1, 0), 0).unwrap();
        let summary = payload[0]["summary"].as_str().unwrap();
        assert!(summary.ends_with(".."));
        assert!(summary.chars().count() <= MAX_SUMMARY_LEN);
    }

    #[test]
    fn caps_the_agenda_at_four_events() {
        let body: String = (0..6)
            .map(|i| vevent(&format!("u{}", i), "Thing", &format!("DTSTART:2025060{}T090000Z", 2 + i)))
            .collect();
        let payload = upcoming_events(&ics(&body), at(2025, 6, 1, 0), 0).unwrap();
        assert_eq!(payload.as_array().unwrap().len(), MAX_EVENTS);
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        assert!(upcoming_events("BEGIN:GARBAGE", at(2025, 6, 1, 0), 0).is_err());
    }

    #[test]
    fn clock_formatting_drops_leading_zero() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let dt = offset.with_ymd_and_hms(2025, 6, 1, 9, 5, 0).unwrap();
        assert_eq!(format_clock(&dt), "9:05am");
    }
}
