//! Bridge from the notification subscription into the hub.

use click_core::{ClickNotification, RealtimeMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::hub::Hub;

/// Serialize once and broadcast to both the workspace feed and the link
/// feed of the click's workspace. Under the hub's delivery rule no client
/// receives both.
pub fn dispatch(hub: &Hub, notification: ClickNotification) -> usize {
    let workspace_id = notification.workspace_id.clone();
    let link_id = notification.link_id.clone();

    let payload: Arc<str> = match serde_json::to_string(&RealtimeMessage::Click(notification)) {
        Ok(json) => Arc::from(json),
        Err(e) => {
            warn!(error = %e, link_id = %link_id, "Failed to encode realtime message");
            return 0;
        }
    };

    hub.broadcast_to_workspace(&workspace_id, payload.clone())
        + hub.broadcast_to_link(&workspace_id, &link_id, payload)
}

/// Dispatch until the subscription channel closes.
pub async fn run_dispatcher(hub: Hub, mut notifications: mpsc::Receiver<ClickNotification>) {
    info!("Realtime dispatcher started");

    while let Some(notification) = notifications.recv().await {
        dispatch(&hub, notification);
    }

    info!("Realtime dispatcher stopped");
}
