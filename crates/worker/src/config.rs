//! Click processor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batching and timing knobs for the click processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Blocking pop timeout; also how often shutdown is observed when idle
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,
    /// Upper bound on events per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Upper bound on time spent collecting one batch
    #[serde(default = "default_max_batch_window_ms")]
    pub max_batch_window_ms: u64,
    /// Pause after a queue read error
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// How long a visitor stays non-unique for a link after a click
    #[serde(default = "default_unique_window_secs")]
    pub unique_window_secs: u64,
    /// Capacity of the unique-visitor cache
    #[serde(default = "default_unique_capacity")]
    pub unique_capacity: u64,
}

fn default_pop_timeout_ms() -> u64 {
    2000
}

fn default_max_batch_size() -> usize {
    100
}

fn default_max_batch_window_ms() -> u64 {
    500
}

fn default_error_backoff_ms() -> u64 {
    1000
}

fn default_unique_window_secs() -> u64 {
    24 * 3600
}

fn default_unique_capacity() -> u64 {
    1_000_000
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            pop_timeout_ms: default_pop_timeout_ms(),
            max_batch_size: default_max_batch_size(),
            max_batch_window_ms: default_max_batch_window_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            unique_window_secs: default_unique_window_secs(),
            unique_capacity: default_unique_capacity(),
        }
    }
}

impl ProcessorConfig {
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn max_batch_window(&self) -> Duration {
        Duration::from_millis(self.max_batch_window_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn unique_window(&self) -> Duration {
        Duration::from_secs(self.unique_window_secs)
    }
}
