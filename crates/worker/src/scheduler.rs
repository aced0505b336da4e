//! Worker scheduler for background tasks.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, warn};

use telemetry::metrics;

use crate::processor::ClickProcessor;

/// A dependency probe run on a fixed interval.
///
/// Implementations record their result in the global health registry.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self) -> bool;
}

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Dependency probe interval
    pub health_check_interval: Duration,
    /// Metrics log interval
    pub metrics_log_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(15),
            metrics_log_interval: Duration::from_secs(60),
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    processor: Option<Arc<ClickProcessor>>,
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            processor: None,
            checks: Vec::new(),
        }
    }

    /// Run the click processor as one of the scheduled tasks.
    pub fn with_processor(mut self, processor: Arc<ClickProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn with_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Starts all background workers. Every task returns once `shutdown`
    /// flips to `true`.
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        if let Some(ref processor) = self.processor {
            let processor = processor.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                processor.run(shutdown).await;
            }));
            info!("Click processor started");
        }

        if !self.checks.is_empty() {
            let scheduler = self.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_health_checks(shutdown).await;
            }));
        }

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log(shutdown).await;
        }));

        info!("Background workers started");
        handles
    }

    async fn run_health_checks(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.health_check_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            for check in &self.checks {
                if !check.check().await {
                    warn!(component = check.name(), "Health check failed");
                }
            }
        }
    }

    async fn run_metrics_log(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.metrics_log_interval);
        // the first tick fires immediately and would log all zeros
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            let snapshot = metrics().snapshot();
            info!(
                enqueued = snapshot.clicks_enqueued,
                popped = snapshot.events_popped,
                persisted = snapshot.clicks_persisted,
                insert_errors = snapshot.click_insert_errors,
                bots = snapshot.bot_clicks,
                analytics_rows = snapshot.analytics_rows_written,
                analytics_errors = snapshot.analytics_errors,
                published = snapshot.notifications_published,
                realtime_sent = snapshot.realtime_messages_sent,
                realtime_dropped = snapshot.realtime_messages_dropped,
                connections = snapshot.active_connections,
                queue_depth = snapshot.queue_depth,
                batch_latency_mean_ms = snapshot.batch_latency_mean_ms,
                "Pipeline metrics"
            );
        }
    }
}
