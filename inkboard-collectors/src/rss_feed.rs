//! RSS collector that keeps the lead headline of each configured feed.
//!
//! The news slot shows one headline per outlet, so only the first item of
//! each feed is kept. Feeds fail independently: a dead outlet is logged
//! and skipped, and the fetch only fails as a whole when every feed fails.

use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use inkboard_types::{unix_time_ms, Record, SourceId};

use crate::{Collector, FetchError};

/// One configured feed: a short display name plus its URL.
#[derive(Debug, Clone)]
pub struct Feed {
    pub name: String,
    pub url: String,
}

/// Collector for lead headlines across several RSS feeds.
#[derive(Debug, Clone)]
pub struct RssCollector {
    client: Client,
    feeds: Vec<Feed>,
    ttl_ms: u64,
}

impl RssCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> RssCollectorBuilder {
        RssCollectorBuilder::default()
    }

    async fn fetch_feed(&self, feed: &Feed) -> Result<Option<String>, FetchError> {
        let response = self.client.get(&feed.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "feed returned status {}",
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        lead_headline(&bytes)
    }
}

#[async_trait::async_trait]
impl Collector for RssCollector {
    fn source(&self) -> SourceId {
        SourceId::Rss
    }

    async fn fetch(&self) -> Result<Record, FetchError> {
        let mut headlines = Vec::new();
        let mut last_error = None;

        for feed in &self.feeds {
            match self.fetch_feed(feed).await {
                Ok(Some(title)) => headlines.push(json!({
                    "source": feed.name,
                    "title": title,
                })),
                Ok(None) => {
                    tracing::debug!(feed = %feed.name, "feed has no items");
                }
                Err(err) => {
                    tracing::warn!(feed = %feed.name, error = %err, "feed fetch failed");
                    last_error = Some(err);
                }
            }
        }

        if headlines.is_empty() {
            if let Some(err) = last_error {
                return Err(err);
            }
        }

        Ok(Record::new(
            SourceId::Rss,
            json!(headlines),
            unix_time_ms(),
            self.ttl_ms,
        ))
    }
}

/// Builder for [`RssCollector`].
#[derive(Debug, Default)]
pub struct RssCollectorBuilder {
    feeds: Vec<Feed>,
    ttl_ms: Option<u64>,
    timeout: Option<Duration>,
}

impl RssCollectorBuilder {
    /// Add a feed to poll.
    pub fn feed(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.feeds.push(Feed {
            name: name.into(),
            url: url.into(),
        });
        self
    }

    /// How long fetched headlines stay fresh (default: 30 minutes).
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
    pub fn build(self) -> RssCollector {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(15));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        RssCollector {
            client,
            feeds: self.feeds,
            ttl_ms: self.ttl_ms.unwrap_or(30 * 60 * 1000),
        }
    }
}

/// Parse a feed body and return its first item's title.
fn lead_headline(bytes: &[u8]) -> Result<Option<String>, FetchError> {
    let channel = rss::Channel::read_from(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(channel
        .items()
        .first()
        .and_then(|item| item.title())
        .map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://news.example.com</link>
    <description>wire</description>
    <item><title>First headline</title></item>
    <item><title>Second headline</title></item>
  </channel>
</rss>"#;

    #[test]
    fn takes_only_the_lead_item() {
        let title = lead_headline(SAMPLE_FEED.as_bytes()).unwrap();
        assert_eq!(title.as_deref(), Some("First headline"));
    }

    #[test]
    fn empty_channel_yields_no_headline() {
        let feed = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title><link>l</link><description>d</description></channel></rss>"#;
        assert_eq!(lead_headline(feed.as_bytes()).unwrap(), None);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = lead_headline(b"this is not xml").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn builder_collects_feeds_in_order() {
        let collector = RssCollector::builder()
            .feed("ABC", "https://example.com/abc.xml")
            .feed("Gdn", "https://example.com/gdn.xml")
            .build();
        assert_eq!(collector.feeds.len(), 2);
        assert_eq!(collector.feeds[0].name, "ABC");
    }
}
