//! Queue health checks.

use crate::event_queue::EventQueue;
use telemetry::{health, metrics};
use tracing::{debug, error};

/// Probe the queue with a depth read.
///
/// Records the depth gauge and the `redis` component status as a side
/// effect, so the health endpoint and the periodic monitor share one path.
pub async fn check_connection(queue: &dyn EventQueue) -> bool {
    match queue.depth().await {
        Ok(depth) => {
            metrics().queue_depth.set(depth);
            health().redis.set_healthy();
            debug!(depth = depth, "Event queue healthy");
            true
        }
        Err(e) => {
            health().redis.set_unhealthy(e.to_string());
            error!("Event queue health check failed: {}", e);
            false
        }
    }
}
