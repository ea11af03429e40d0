//! Collector client errors

use thiserror::Error;

/// Errors that can occur when querying a collector's target API
#[derive(Debug, Error)]
pub enum CollectorError {
    /// HTTP request/response error (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Collector answered with a non-success status or error envelope
    #[error("Collector API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No collector is known at the requested address
    #[error("Not found: {0}")]
    NotFound(String),
}
