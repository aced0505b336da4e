//! Viewer control messages.

use serde::Deserialize;

/// Inbound message from a viewer.
///
/// Wire form: `{"action": "subscribe" | "unsubscribe", "link_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlMessage {
    Subscribe { link_id: String },
    Unsubscribe { link_id: String },
}

impl ControlMessage {
    /// Parse a text frame. Malformed JSON, unknown actions, and empty link
    /// ids all yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let message: Self = serde_json::from_str(text).ok()?;
        if message.link_id().is_empty() {
            return None;
        }
        Some(message)
    }

    pub fn link_id(&self) -> &str {
        match self {
            Self::Subscribe { link_id } | Self::Unsubscribe { link_id } => link_id,
        }
    }
}
