//! Viewer WebSocket endpoint and hub statistics.

use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    response::Response,
    Json,
};
use realtime::ConnectionConfig;
use telemetry::metrics;
use tracing::debug;

use crate::response::{ApiError, StatsResponse};
use crate::state::AppState;

/// Hard cap on a single inbound frame. Messages above the configured
/// `max_message_size` but below this are read and ignored; anything larger
/// fails the connection at the transport.
const FRAME_LIMIT: usize = 64 * 1024;

const MAX_WORKSPACE_ID_LEN: usize = 128;

/// Transport limit for one viewer connection. Never below the configured
/// message size, so a message the read loop would accept always arrives.
fn frame_limit(config: &ConnectionConfig) -> usize {
    FRAME_LIMIT.max(config.max_message_size)
}

fn valid_workspace_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_WORKSPACE_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// GET /ws/:workspace_id - Upgrade to a live click feed for the workspace.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    if !valid_workspace_id(&workspace_id) {
        return Err(ApiError::bad_request("invalid workspace id"));
    }

    debug!(workspace_id = %workspace_id, "Viewer connecting");

    let hub = state.hub.clone();
    let config = state.connection.clone();
    let limit = frame_limit(&config);

    Ok(ws
        .max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| realtime::serve_socket(socket, hub, workspace_id, config)))
}

/// GET /realtime/stats - Hub counts and delivery counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.hub.stats();

    Json(StatsResponse {
        clients: stats.clients,
        workspaces: stats.workspaces,
        links: stats.links,
        messages_sent: metrics().realtime_messages_sent.get(),
        messages_dropped: metrics().realtime_messages_dropped.get(),
    })
}
