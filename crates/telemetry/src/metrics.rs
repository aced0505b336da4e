//! Internal metrics collection.
//!
//! Collects metrics in-memory; snapshots are logged periodically by the
//! worker scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements, saturating at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the click pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Enqueue boundary
    pub clicks_enqueued: Counter,
    pub enqueue_errors: Counter,
    pub enqueue_dropped: Counter,

    // Click processor
    pub events_popped: Counter,
    pub events_malformed: Counter,
    pub batches_processed: Counter,
    pub queue_errors: Counter,
    pub bot_clicks: Counter,

    // Primary store
    pub clicks_persisted: Counter,
    pub click_insert_errors: Counter,
    pub counter_increments: Counter,
    pub counter_errors: Counter,

    // Secondary store
    pub analytics_rows_written: Counter,
    pub analytics_errors: Counter,

    // Notifications
    pub notifications_published: Counter,
    pub publish_errors: Counter,
    pub notifications_received: Counter,
    pub notifications_malformed: Counter,

    // Realtime delivery
    pub realtime_messages_sent: Counter,
    pub realtime_messages_dropped: Counter,
    pub connection_errors: Counter,

    // Latency histograms
    pub batch_latency_ms: Histogram,
    pub primary_latency_ms: Histogram,
    pub analytics_latency_ms: Histogram,

    // Gauges
    pub active_connections: Gauge,
    pub queue_depth: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub clicks_enqueued: u64,
    pub enqueue_errors: u64,
    pub enqueue_dropped: u64,
    pub events_popped: u64,
    pub events_malformed: u64,
    pub batches_processed: u64,
    pub bot_clicks: u64,
    pub clicks_persisted: u64,
    pub click_insert_errors: u64,
    pub counter_increments: u64,
    pub analytics_rows_written: u64,
    pub analytics_errors: u64,
    pub notifications_published: u64,
    pub publish_errors: u64,
    pub realtime_messages_sent: u64,
    pub realtime_messages_dropped: u64,
    pub batch_latency_mean_ms: f64,
    pub primary_latency_mean_ms: f64,
    pub analytics_latency_mean_ms: f64,
    pub active_connections: u64,
    pub queue_depth: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            clicks_enqueued: self.clicks_enqueued.get(),
            enqueue_errors: self.enqueue_errors.get(),
            enqueue_dropped: self.enqueue_dropped.get(),
            events_popped: self.events_popped.get(),
            events_malformed: self.events_malformed.get(),
            batches_processed: self.batches_processed.get(),
            bot_clicks: self.bot_clicks.get(),
            clicks_persisted: self.clicks_persisted.get(),
            click_insert_errors: self.click_insert_errors.get(),
            counter_increments: self.counter_increments.get(),
            analytics_rows_written: self.analytics_rows_written.get(),
            analytics_errors: self.analytics_errors.get(),
            notifications_published: self.notifications_published.get(),
            publish_errors: self.publish_errors.get(),
            realtime_messages_sent: self.realtime_messages_sent.get(),
            realtime_messages_dropped: self.realtime_messages_dropped.get(),
            batch_latency_mean_ms: self.batch_latency_ms.mean(),
            primary_latency_mean_ms: self.primary_latency_ms.mean(),
            analytics_latency_mean_ms: self.analytics_latency_ms.mean(),
            active_connections: self.active_connections.get(),
            queue_depth: self.queue_depth.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
