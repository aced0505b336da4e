//! Click event queue and notification pub/sub.
//!
//! Two backends implement the same traits: Redis (lists for the queue,
//! PUBLISH/SUBSCRIBE for notifications) and an in-process memory backend for
//! single-node development and tests.

pub mod config;
pub mod enqueue;
pub mod event_queue;
pub mod health;
pub mod memory;
pub mod pubsub;
pub mod redis_backend;

pub use config::*;
pub use enqueue::{ClickEnqueuer, DEFAULT_ENQUEUE_CAPACITY};
pub use event_queue::EventQueue;
pub use memory::{MemoryEventQueue, MemoryPubSub};
pub use pubsub::{NotificationPublisher, NotificationSubscriber};
pub use redis_backend::{RedisEventQueue, RedisPubSub};
