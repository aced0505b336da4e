//! In-process queue and pub/sub backends.

use async_trait::async_trait;
use click_core::{ClickNotification, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::event_queue::EventQueue;
use crate::pubsub::{
    decode_notification, encode_notification, NotificationPublisher, NotificationSubscriber,
};

/// FIFO queue held in memory.
#[derive(Default)]
pub struct MemoryEventQueue {
    items: Mutex<VecDeque<String>>,
    ready: Notify,
}

impl MemoryEventQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventQueue for MemoryEventQueue {
    async fn push(&self, payload: String) -> Result<()> {
        self.items.lock().push_back(payload);
        // notify_one stores a permit when nobody is waiting yet
        self.ready.notify_one();
        Ok(())
    }

    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(payload) = self.items.lock().pop_front() {
                return Ok(Some(payload));
            }

            if tokio::time::timeout_at(deadline, self.ready.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn try_pop(&self) -> Result<Option<String>> {
        Ok(self.items.lock().pop_front())
    }

    async fn depth(&self) -> Result<u64> {
        Ok(self.items.lock().len() as u64)
    }
}

/// Broadcast channel held in memory.
pub struct MemoryPubSub {
    tx: broadcast::Sender<String>,
    subscriber_buffer: usize,
}

impl MemoryPubSub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            subscriber_buffer: capacity.max(1),
        }
    }

    /// Publish a raw payload, bypassing serialization.
    pub fn publish_raw(&self, payload: impl Into<String>) {
        let _ = self.tx.send(payload.into());
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl NotificationPublisher for MemoryPubSub {
    async fn publish(&self, notification: &ClickNotification) -> Result<()> {
        let payload = encode_notification(notification)?;
        // No receivers means nobody is listening; the message is lost.
        if self.tx.send(payload).is_err() {
            debug!("No subscribers for notification");
        }
        Ok(())
    }
}

impl NotificationSubscriber for MemoryPubSub {
    fn subscribe(&self, mut shutdown: watch::Receiver<bool>) -> mpsc::Receiver<ClickNotification> {
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);
        let mut source = self.tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    received = source.recv() => match received {
                        Ok(payload) => {
                            let Some(notification) = decode_notification(&payload) else {
                                continue;
                            };
                            if tx.send(notification).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "Notification subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            debug!("Memory notification subscriber stopped");
        });

        rx
    }
}
