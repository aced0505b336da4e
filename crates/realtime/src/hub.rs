//! Registry of live viewer connections.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use click_core::{Error, Result};

use crate::client::{Client, ClientId};

/// Hub channel sizing.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Pending registrations before `register` waits
    pub register_buffer: usize,
    /// Pending unregistrations before `unregister` waits
    pub unregister_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            register_buffer: 256,
            unregister_buffer: 256,
        }
    }
}

/// Counts exposed on the stats endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub clients: usize,
    pub workspaces: usize,
    pub links: usize,
}

struct ClientEntry {
    sender: mpsc::Sender<Arc<str>>,
    workspace_id: String,
    links: HashSet<String>,
}

#[derive(Default)]
struct Indices {
    clients: HashMap<ClientId, ClientEntry>,
    workspaces: HashMap<String, HashSet<ClientId>>,
    links: HashMap<String, HashSet<ClientId>>,
}

impl Indices {
    fn insert(&mut self, client: Client) {
        let (id, workspace_id, sender) = client.into_parts();
        self.workspaces
            .entry(workspace_id.clone())
            .or_default()
            .insert(id);
        self.clients.insert(
            id,
            ClientEntry {
                sender,
                workspace_id,
                links: HashSet::new(),
            },
        );
    }

    /// Scope the client out of every index. Dropping the entry drops the
    /// buffer's only sender.
    fn remove(&mut self, id: ClientId) -> bool {
        let Some(entry) = self.clients.remove(&id) else {
            return false;
        };

        if let Some(members) = self.workspaces.get_mut(&entry.workspace_id) {
            members.remove(&id);
            if members.is_empty() {
                self.workspaces.remove(&entry.workspace_id);
            }
        }

        for link_id in &entry.links {
            self.unlink(link_id, id);
        }
        true
    }

    fn unlink(&mut self, link_id: &str, id: ClientId) {
        if let Some(members) = self.links.get_mut(link_id) {
            members.remove(&id);
            if members.is_empty() {
                self.links.remove(link_id);
            }
        }
    }
}

/// Non-blocking delivery into one client buffer. A full buffer drops the
/// message for that client.
fn deliver(entry: &ClientEntry, message: &Arc<str>) -> bool {
    match entry.sender.try_send(message.clone()) {
        Ok(()) => {
            metrics().realtime_messages_sent.inc();
            true
        }
        Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
            metrics().realtime_messages_dropped.inc();
            false
        }
    }
}

/// Cloneable handle to the hub.
///
/// Delivery rule: a client with at least one link subscription receives only
/// link broadcasts for its links; a client without any receives every
/// workspace broadcast for its workspace.
#[derive(Clone)]
pub struct Hub {
    indices: Arc<RwLock<Indices>>,
    register_tx: mpsc::Sender<(Client, oneshot::Sender<()>)>,
    unregister_tx: mpsc::Sender<ClientId>,
}

/// The task that applies registrations and unregistrations.
pub struct HubLoop {
    indices: Arc<RwLock<Indices>>,
    register_rx: mpsc::Receiver<(Client, oneshot::Sender<()>)>,
    unregister_rx: mpsc::Receiver<ClientId>,
}

impl Hub {
    /// Create a hub and the loop that must be spawned to serve it.
    pub fn new(config: HubConfig) -> (Self, HubLoop) {
        let indices = Arc::new(RwLock::new(Indices::default()));
        let (register_tx, register_rx) = mpsc::channel(config.register_buffer.max(1));
        let (unregister_tx, unregister_rx) = mpsc::channel(config.unregister_buffer.max(1));

        let hub = Self {
            indices: indices.clone(),
            register_tx,
            unregister_tx,
        };
        let hub_loop = HubLoop {
            indices,
            register_rx,
            unregister_rx,
        };
        (hub, hub_loop)
    }

    /// Register a client and wait until the loop has applied it, so
    /// subscriptions sent right after connecting are not lost.
    pub async fn register(&self, client: Client) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.register_tx
            .send((client, ack_tx))
            .await
            .map_err(|_| Error::internal("realtime hub is not running"))?;
        ack_rx
            .await
            .map_err(|_| Error::internal("realtime hub stopped during registration"))
    }

    /// Request removal of a client. Unknown ids are ignored.
    pub async fn unregister(&self, id: ClientId) {
        if self.unregister_tx.send(id).await.is_err() {
            debug!(client_id = %id, "Hub already stopped; nothing to unregister");
        }
    }

    /// Narrow a client's feed to a link. Returns false for unknown clients.
    pub fn subscribe_link(&self, id: ClientId, link_id: &str) -> bool {
        let mut indices = self.indices.write();
        let Some(entry) = indices.clients.get_mut(&id) else {
            return false;
        };
        entry.links.insert(link_id.to_string());
        indices
            .links
            .entry(link_id.to_string())
            .or_default()
            .insert(id);
        true
    }

    /// Drop a link subscription. A client left with no links goes back to
    /// the workspace feed.
    pub fn unsubscribe_link(&self, id: ClientId, link_id: &str) -> bool {
        let mut indices = self.indices.write();
        let Some(entry) = indices.clients.get_mut(&id) else {
            return false;
        };
        if !entry.links.remove(link_id) {
            return false;
        }
        indices.unlink(link_id, id);
        true
    }

    /// Deliver to every client of the workspace that has no link
    /// subscriptions. Returns how many buffers accepted the message.
    pub fn broadcast_to_workspace(&self, workspace_id: &str, message: Arc<str>) -> usize {
        let indices = self.indices.read();
        let Some(members) = indices.workspaces.get(workspace_id) else {
            return 0;
        };

        members
            .iter()
            .filter_map(|id| indices.clients.get(id))
            .filter(|entry| entry.links.is_empty())
            .filter(|entry| deliver(entry, &message))
            .count()
    }

    /// Deliver to every client of the workspace subscribed to the link.
    /// Subscribers from other workspaces are skipped.
    pub fn broadcast_to_link(
        &self,
        workspace_id: &str,
        link_id: &str,
        message: Arc<str>,
    ) -> usize {
        let indices = self.indices.read();
        let Some(members) = indices.links.get(link_id) else {
            return 0;
        };

        members
            .iter()
            .filter_map(|id| indices.clients.get(id))
            .filter(|entry| entry.workspace_id == workspace_id)
            .filter(|entry| deliver(entry, &message))
            .count()
    }

    pub fn is_registered(&self, id: ClientId) -> bool {
        self.indices.read().clients.contains_key(&id)
    }

    pub fn stats(&self) -> HubStats {
        let indices = self.indices.read();
        HubStats {
            clients: indices.clients.len(),
            workspaces: indices.workspaces.len(),
            links: indices.links.len(),
        }
    }
}

impl HubLoop {
    /// Apply registrations until shutdown, then drop every client, which
    /// closes all outbound buffers.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Realtime hub started");

        loop {
            tokio::select! {
                Some((client, ack)) = self.register_rx.recv() => {
                    let id = client.id();
                    self.indices.write().insert(client);
                    metrics().active_connections.inc();
                    debug!(client_id = %id, "Client registered");
                    let _ = ack.send(());
                }
                Some(id) = self.unregister_rx.recv() => {
                    if self.indices.write().remove(id) {
                        metrics().active_connections.dec();
                        debug!(client_id = %id, "Client unregistered");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let dropped = {
            let mut indices = self.indices.write();
            let count = indices.clients.len();
            *indices = Indices::default();
            count
        };
        metrics().active_connections.set(0);
        info!(clients = dropped, "Realtime hub stopped");
    }
}
