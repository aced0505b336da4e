//! Event queue capability.

use async_trait::async_trait;
use click_core::Result;
use std::time::Duration;

/// Durable, ordered, multi-producer/multi-consumer list of serialized clicks.
///
/// No transactional semantics: a popped payload is gone from the queue even
/// if the consumer never finishes processing it.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Append a payload at the tail.
    async fn push(&self, payload: String) -> Result<()>;

    /// Pop from the head, waiting up to `timeout`. `Ok(None)` means the
    /// timeout elapsed with nothing to pop.
    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<String>>;

    /// Pop from the head without waiting.
    async fn try_pop(&self) -> Result<Option<String>>;

    /// Number of payloads waiting.
    async fn depth(&self) -> Result<u64>;
}
