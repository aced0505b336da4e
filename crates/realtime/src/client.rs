//! Viewer connection identity and outbound buffer.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier of one viewer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A viewer about to be registered with the hub.
///
/// Holds the only sender of the outbound buffer. Once registered the hub
/// owns it, so removing the client from the hub closes the buffer.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    workspace_id: String,
    sender: mpsc::Sender<Arc<str>>,
}

impl Client {
    /// Create a client and the receiving end of its outbound buffer.
    pub fn new(workspace_id: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let client = Self {
            id: ClientId::new(),
            workspace_id: workspace_id.into(),
            sender,
        };
        (client, receiver)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub(crate) fn into_parts(self) -> (ClientId, String, mpsc::Sender<Arc<str>>) {
        (self.id, self.workspace_id, self.sender)
    }
}
