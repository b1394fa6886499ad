//! Application-wide error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Retryable source failure (network error, 5xx response).
    #[error("Transient source error: {0}")]
    TransientSource(String),

    /// API quota exhausted. Polling must be suspended until `resets_at`.
    #[error("API quota exceeded, polling suspended until {resets_at}")]
    QuotaExceeded { resets_at: DateTime<Utc> },

    /// Non-retryable source failure (bad request shape, unknown channel).
    #[error("Fatal source error: {0}")]
    FatalSource(String),

    /// A single webhook delivery failed (HTTP status and body when available).
    #[error("Webhook delivery failed: {0}")]
    WebhookDelivery(String),

    /// Every webhook target of a channel failed; carries the per-target
    /// failure list for diagnostics.
    #[error("All webhook deliveries failed for channel {channel}: {details}")]
    Notification { channel: String, details: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientSource(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::FatalSource(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}
