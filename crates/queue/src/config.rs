//! Queue and pub/sub configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend carries click events and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// Redis list + pub/sub; processor and hub may run in different processes
    Redis,
    /// In-process queue and broadcast; everything must run in one process
    Memory,
}

/// Queue and notification channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_backend")]
    pub backend: QueueBackend,
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Name of the list holding serialized click events
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    /// Name of the pub/sub channel carrying click notifications
    #[serde(default = "default_notification_channel")]
    pub notification_channel: String,
    /// Fixed backoff before re-subscribing after a pub/sub failure
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
    /// Buffer between the subscriber task and its consumer
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

fn default_backend() -> QueueBackend {
    QueueBackend::Redis
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_queue_key() -> String {
    "clicks:queue".to_string()
}

fn default_notification_channel() -> String {
    "clicks:notifications".to_string()
}

fn default_reconnect_backoff_ms() -> u64 {
    1000
}

fn default_subscriber_buffer() -> usize {
    1024
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            queue_key: default_queue_key(),
            notification_channel: default_notification_channel(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl QueueConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }
}
