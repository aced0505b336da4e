//! Redis backend: a list for the event queue, PUBLISH/SUBSCRIBE for
//! notifications.

use async_trait::async_trait;
use click_core::{ClickNotification, Error, Result};
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use telemetry::metrics;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::event_queue::EventQueue;
use crate::pubsub::{
    decode_notification, encode_notification, NotificationPublisher, NotificationSubscriber,
};

/// Upper bound on a single server-side BLPOP wait; kept below the client's
/// response timeout so a long pop is never mistaken for a dead connection.
const BLPOP_SLICE: Duration = Duration::from_millis(400);

fn open_client(url: &str) -> Result<Client> {
    Client::open(url).map_err(|e| Error::queue(format!("Invalid Redis URL: {}", e)))
}

/// Click queue stored in a Redis list.
///
/// BLPOP occupies the multiplexed connection while it waits, so consumers
/// should not share an instance with producers.
#[derive(Clone)]
pub struct RedisEventQueue {
    conn: ConnectionManager,
    key: String,
}

impl RedisEventQueue {
    /// Connects and verifies the connection with a PING.
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        let client = open_client(&config.redis_url)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::queue(format!("Failed to connect to Redis: {}", e)))?;

        let mut probe = conn.clone();
        probe
            .ping::<()>()
            .await
            .map_err(|e| Error::queue(format!("Redis PING failed: {}", e)))?;

        info!(key = %config.queue_key, "Connected Redis event queue");

        Ok(Self {
            conn,
            key: config.queue_key.clone(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl EventQueue for RedisEventQueue {
    async fn push(&self, payload: String) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(&self.key, payload)
            .await
            .map_err(|e| Error::queue(format!("RPUSH failed: {}", e)))
    }

    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut conn = self.conn.clone();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let wait = remaining.min(BLPOP_SLICE);
            let popped: Option<(String, String)> = conn
                .blpop(&self.key, wait.as_secs_f64())
                .await
                .map_err(|e| Error::queue(format!("BLPOP failed: {}", e)))?;

            if let Some((_, payload)) = popped {
                return Ok(Some(payload));
            }
        }
    }

    async fn try_pop(&self) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.lpop(&self.key, None)
            .await
            .map_err(|e| Error::queue(format!("LPOP failed: {}", e)))
    }

    async fn depth(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.llen(&self.key)
            .await
            .map_err(|e| Error::queue(format!("LLEN failed: {}", e)))
    }
}

/// Notification channel on Redis pub/sub.
#[derive(Clone)]
pub struct RedisPubSub {
    client: Client,
    conn: ConnectionManager,
    channel: String,
    reconnect_backoff: Duration,
    subscriber_buffer: usize,
}

impl RedisPubSub {
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        let client = open_client(&config.redis_url)?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| Error::pubsub(format!("Failed to connect to Redis: {}", e)))?;

        info!(channel = %config.notification_channel, "Connected Redis notification channel");

        Ok(Self {
            client,
            conn,
            channel: config.notification_channel.clone(),
            reconnect_backoff: config.reconnect_backoff(),
            subscriber_buffer: config.subscriber_buffer,
        })
    }

    /// Runs one subscription until the stream ends or shutdown is requested.
    ///
    /// Returns `Ok(true)` when the loop should stop for good.
    async fn pump(
        &self,
        tx: &mpsc::Sender<ClickNotification>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<bool> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| Error::pubsub(format!("Failed to open subscription: {}", e)))?;
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| Error::pubsub(format!("SUBSCRIBE failed: {}", e)))?;

        info!(channel = %self.channel, "Subscribed to notifications");

        let mut messages = pubsub.on_message();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(true);
                    }
                }
                message = messages.next() => {
                    let Some(message) = message else {
                        return Err(Error::pubsub("subscription stream ended"));
                    };
                    let payload: String = match message.get_payload() {
                        Ok(payload) => payload,
                        Err(e) => {
                            metrics().notifications_malformed.inc();
                            warn!(error = %e, "Dropping unreadable notification payload");
                            continue;
                        }
                    };
                    if let Some(notification) = decode_notification(&payload) {
                        if tx.send(notification).await.is_err() {
                            // consumer went away
                            return Ok(true);
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl NotificationPublisher for RedisPubSub {
    async fn publish(&self, notification: &ClickNotification) -> Result<()> {
        let payload = encode_notification(notification)?;
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| Error::pubsub(format!("PUBLISH failed: {}", e)))?;

        if receivers == 0 {
            debug!(link_id = %notification.link_id, "No subscribers for notification");
        }
        Ok(())
    }
}

impl NotificationSubscriber for RedisPubSub {
    fn subscribe(&self, mut shutdown: watch::Receiver<bool>) -> mpsc::Receiver<ClickNotification> {
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);
        let this = self.clone();

        tokio::spawn(async move {
            loop {
                if *shutdown.borrow() {
                    break;
                }

                match this.pump(&tx, &mut shutdown).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(
                            error = %e,
                            backoff_ms = %this.reconnect_backoff.as_millis(),
                            "Notification subscription failed, retrying"
                        );
                        tokio::select! {
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    break;
                                }
                            }
                            _ = tokio::time::sleep(this.reconnect_backoff) => {}
                        }
                    }
                }
            }
            info!(channel = %this.channel, "Notification subscriber stopped");
        });

        rx
    }
}
