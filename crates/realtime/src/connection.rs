//! Per-connection read and write loops.

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, timeout_at, Instant};
use tracing::{debug, warn};

use click_core::{Error, Result};

use crate::client::{Client, ClientId};
use crate::hub::Hub;
use crate::protocol::ControlMessage;

/// Keepalive and sizing for viewer connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Interval between server pings; must be shorter than `pong_wait_ms`
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Read deadline, refreshed on every pong
    #[serde(default = "default_pong_wait_ms")]
    pub pong_wait_ms: u64,
    /// Deadline for a single outbound frame
    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,
    /// Largest inbound message acted upon, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Outbound buffer capacity, in messages
    #[serde(default = "default_send_buffer")]
    pub send_buffer: usize,
}

fn default_ping_interval_ms() -> u64 {
    54_000
}

fn default_pong_wait_ms() -> u64 {
    60_000
}

fn default_write_wait_ms() -> u64 {
    10_000
}

fn default_max_message_size() -> usize {
    512
}

fn default_send_buffer() -> usize {
    256
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            pong_wait_ms: default_pong_wait_ms(),
            write_wait_ms: default_write_wait_ms(),
            max_message_size: default_max_message_size(),
            send_buffer: default_send_buffer(),
        }
    }
}

impl ConnectionConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    /// A ping interval at or above the pong wait would let healthy idle
    /// connections hit the read deadline.
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval_ms == 0 || self.ping_interval_ms >= self.pong_wait_ms {
            return Err(Error::config(format!(
                "ping interval ({}ms) must be non-zero and shorter than pong wait ({}ms)",
                self.ping_interval_ms, self.pong_wait_ms
            )));
        }
        if self.write_wait_ms == 0 {
            return Err(Error::config("write wait must be non-zero"));
        }
        if self.max_message_size == 0 || self.send_buffer == 0 {
            return Err(Error::config("max message size and send buffer must be non-zero"));
        }
        Ok(())
    }
}

/// Register a viewer for `workspace_id` and serve the socket until it
/// closes.
pub async fn serve_socket(socket: WebSocket, hub: Hub, workspace_id: String, config: ConnectionConfig) {
    let (client, outbound) = Client::new(workspace_id, config.send_buffer);
    let id = client.id();

    if let Err(e) = hub.register(client).await {
        warn!(error = %e, "Rejecting viewer connection");
        return;
    }

    let (sink, stream) = socket.split();
    run_connection(sink, stream, outbound, hub, id, config).await;
}

/// Run both loops for a registered client.
///
/// Whichever loop ends first ends the connection; the client is then
/// unregistered, which closes its buffer and lets the writer send Close.
pub async fn run_connection<K, S, E>(
    sink: K,
    stream: S,
    outbound: mpsc::Receiver<Arc<str>>,
    hub: Hub,
    id: ClientId,
    config: ConnectionConfig,
) where
    K: Sink<Message> + Unpin + Send + 'static,
    K::Error: Display,
    S: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
{
    let mut writer = tokio::spawn(write_loop(sink, outbound, config.clone()));

    let writer_finished = tokio::select! {
        _ = read_loop(stream, &hub, id, &config) => false,
        _ = &mut writer => true,
    };

    hub.unregister(id).await;

    if !writer_finished && timeout(config.write_wait(), &mut writer).await.is_err() {
        writer.abort();
    }
    debug!(client_id = %id, "Viewer connection closed");
}

/// Inbound loop: apply control messages until the peer goes away or the
/// read deadline passes.
pub async fn read_loop<S, E>(mut stream: S, hub: &Hub, id: ClientId, config: &ConnectionConfig)
where
    S: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + config.pong_wait();

    loop {
        let message = match timeout_at(deadline, stream.next()).await {
            Err(_) => {
                debug!(client_id = %id, "Read deadline expired");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                metrics().connection_errors.inc();
                warn!(client_id = %id, error = %e, "Viewer read error");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                if text.len() > config.max_message_size {
                    debug!(client_id = %id, len = text.len(), "Ignoring oversized message");
                    continue;
                }
                apply_control(hub, id, &text);
            }
            Message::Pong(_) => {
                deadline = Instant::now() + config.pong_wait();
            }
            Message::Close(_) => break,
            Message::Binary(_) | Message::Ping(_) => {}
        }
    }
}

fn apply_control(hub: &Hub, id: ClientId, text: &str) {
    match ControlMessage::parse(text) {
        Some(ControlMessage::Subscribe { link_id }) => {
            hub.subscribe_link(id, &link_id);
        }
        Some(ControlMessage::Unsubscribe { link_id }) => {
            hub.unsubscribe_link(id, &link_id);
        }
        None => debug!(client_id = %id, "Ignoring unrecognized control message"),
    }
}

/// Outbound loop: forward buffered messages and keep the connection alive
/// with pings. Ends on a failed or slow write, or once the buffer closes.
pub async fn write_loop<K>(mut sink: K, mut outbound: mpsc::Receiver<Arc<str>>, config: ConnectionConfig)
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    let mut ping = interval_at(Instant::now() + config.ping_interval(), config.ping_interval());

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(text) => {
                    if send(&mut sink, Message::Text(text.to_string()), &config).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = send(&mut sink, Message::Close(None), &config).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if send(&mut sink, Message::Ping(Vec::new()), &config).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send<K>(sink: &mut K, message: Message, config: &ConnectionConfig) -> std::result::Result<(), ()>
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    match timeout(config.write_wait(), sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            metrics().connection_errors.inc();
            warn!(error = %e, "Viewer write error");
            Err(())
        }
        Err(_) => {
            metrics().connection_errors.inc();
            warn!("Viewer write deadline expired");
            Err(())
        }
    }
}
