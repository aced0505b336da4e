//! Unified error types for the click pipeline.
//!
//! Errors are grouped by the subsystem that produced them so that long-running
//! loops can decide between backoff-and-retry (transient infrastructure) and
//! drop-and-continue (bad data, best-effort stores).

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the click pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Event queue unreachable or returned an error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Notification pub/sub unreachable or returned an error.
    #[error("pubsub error: {0}")]
    PubSub(String),

    /// Primary store write failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Secondary analytics store write failed.
    #[error("analytics error: {0}")]
    Analytics(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    pub fn pubsub(msg: impl Into<String>) -> Self {
        Self::PubSub(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn analytics(msg: impl Into<String>) -> Self {
        Self::Analytics(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error comes from infrastructure that is expected to recover
    /// on its own (retry with backoff rather than drop).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Queue(_) | Self::PubSub(_))
    }
}
