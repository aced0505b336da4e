//! Notification publish/subscribe capabilities.
//!
//! Pub/sub, not a queue: a notification published while nobody is
//! subscribed is lost.

use async_trait::async_trait;
use click_core::{ClickNotification, Result};
use telemetry::metrics;
use tokio::sync::{mpsc, watch};
use tracing::warn;

/// Publishes click notifications to a named broadcast channel.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Publish without waiting for any subscriber.
    async fn publish(&self, notification: &ClickNotification) -> Result<()>;
}

/// Long-lived subscription to the notification channel.
pub trait NotificationSubscriber: Send + Sync {
    /// Start a background subscription.
    ///
    /// Decoded notifications are delivered on the returned channel. When
    /// `shutdown` flips to `true` the background task drops its sender and
    /// returns, which closes the channel.
    fn subscribe(&self, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<ClickNotification>;
}

pub(crate) fn encode_notification(notification: &ClickNotification) -> Result<String> {
    Ok(serde_json::to_string(notification)?)
}

/// Decode one message; bad messages are logged, counted, and skipped.
pub(crate) fn decode_notification(payload: &str) -> Option<ClickNotification> {
    metrics().notifications_received.inc();

    match serde_json::from_str::<ClickNotification>(payload) {
        Ok(notification) => Some(notification),
        Err(e) => {
            metrics().notifications_malformed.inc();
            warn!(error = %e, len = payload.len(), "Dropping malformed notification");
            None
        }
    }
}
