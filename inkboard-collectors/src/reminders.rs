//! Reminders collector for a JSON task-list endpoint.
//!
//! Expects a simple self-hosted tasks API (Vikunja/Tasks.org-export style):
//! a GET returning a JSON array of items with a title, an optional due
//! date, and a done flag. Completed items never reach the panel.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use inkboard_types::{unix_time_ms, Record, SourceId};

use crate::{Collector, FetchError};

const MAX_ITEMS: usize = 6;

/// Collector for open reminder items.
#[derive(Debug, Clone)]
pub struct RemindersCollector {
    client: Client,
    endpoint: String,
    token: Option<String>,
    ttl_ms: u64,
}

impl RemindersCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> RemindersCollectorBuilder {
        RemindersCollectorBuilder::default()
    }
}

#[async_trait::async_trait]
impl Collector for RemindersCollector {
    fn source(&self) -> SourceId {
        SourceId::Reminders
    }

    async fn fetch(&self) -> Result<Record, FetchError> {
        let mut request = self.client.get(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Auth("token rejected".to_string()));
        }
        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let items: Vec<ReminderItem> = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(Record::new(
            SourceId::Reminders,
            open_items(&items),
            unix_time_ms(),
            self.ttl_ms,
        ))
    }
}

/// Builder for [`RemindersCollector`].
#[derive(Debug, Default)]
pub struct RemindersCollectorBuilder {
    endpoint: Option<String>,
    token: Option<String>,
    ttl_ms: Option<u64>,
    timeout: Option<Duration>,
}

impl RemindersCollectorBuilder {
    /// Set the tasks endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set a bearer token for the endpoint.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// How long a fetched list stays fresh (default: 15 minutes).
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
    pub fn build(self) -> RemindersCollector {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(15));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        RemindersCollector {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| "http://localhost:3456/api/v1/tasks".to_string()),
            token: self.token,
            ttl_ms: self.ttl_ms.unwrap_or(15 * 60 * 1000),
        }
    }
}

/// Keep open items only, capped for the slot.
fn open_items(items: &[ReminderItem]) -> serde_json::Value {
    let rows: Vec<_> = items
        .iter()
        .filter(|item| !item.done)
        .take(MAX_ITEMS)
        .map(|item| {
            json!({
                "title": item.title,
                "due": item.due_date,
            })
        })
        .collect();
    json!(rows)
}

/// One task from the reminders API.
#[derive(Debug, Deserialize)]
struct ReminderItem {
    title: String,
    #[serde(default)]
    done: bool,
    #[serde(default, rename = "due_date")]
    due_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_out_completed_items() {
        let items: Vec<ReminderItem> = serde_json::from_str(
            r#"[
                {"title": "Water plants", "done": false},
                {"title": "File taxes", "done": true},
                {"title": "Book service", "done": false, "due_date": "2025-06-10"}
            ]"#,
        )
        .unwrap();

        let payload = open_items(&items);
        let rows = payload.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], "Water plants");
        assert_eq!(rows[1]["due"], "2025-06-10");
    }

    #[test]
    fn missing_flags_default_to_open() {
        let items: Vec<ReminderItem> =
            serde_json::from_str(r#"[{"title": "Take out bins"}]"#).unwrap();
        assert_eq!(open_items(&items).as_array().unwrap().len(), 1);
    }

    #[test]
    fn caps_the_list() {
        let items: Vec<ReminderItem> = (0..10)
            .map(|i| ReminderItem {
                title: format!("task {}", i),
                done: false,
                due_date: None,
            })
            .collect();
        assert_eq!(open_items(&items).as_array().unwrap().len(), MAX_ITEMS);
    }

    #[test]
    fn test_builder_defaults() {
        let collector = RemindersCollector::builder().build();
        assert!(collector.token.is_none());
        assert_eq!(collector.ttl_ms, 15 * 60 * 1000);
    }
}
