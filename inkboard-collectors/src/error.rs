//! Error types for collectors.

use thiserror::Error;

/// Errors that can occur while fetching a feed.
///
/// These are ordinary, recoverable conditions: the orchestrator records
/// them against the source and retries on the source's own cadence. A
/// collector never panics for a network or parse problem.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Response body could not be parsed.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Could not reach the endpoint.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request exceeded its deadline.
    #[error("Request timed out")]
    Timeout,

    /// The response parsed but its shape was not usable.
    #[error("Unusable payload: {0}")]
    Payload(String),

    /// Local read failed (sensor file and similar non-network sources).
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}
