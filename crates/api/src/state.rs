//! Application state shared across handlers.

use queue::EventQueue;
use realtime::{ConnectionConfig, Hub};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Realtime hub viewers register with
    pub hub: Hub,
    /// Keepalive and sizing for viewer connections
    pub connection: ConnectionConfig,
    /// Event queue, polled for depth by the health endpoint
    pub queue: Option<Arc<dyn EventQueue>>,
}

impl AppState {
    pub fn new(hub: Hub, connection: ConnectionConfig) -> Self {
        Self {
            hub,
            connection,
            queue: None,
        }
    }

    pub fn with_queue(mut self, queue: Arc<dyn EventQueue>) -> Self {
        self.queue = Some(queue);
        self
    }
}
