//! Live-viewer notification types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::EnrichedClick;

/// Minimal projection of an [`EnrichedClick`] used for live fan-out.
///
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickNotification {
    pub workspace_id: String,
    pub link_id: String,
    pub short_code: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub browser: String,
    #[serde(default)]
    pub referer: String,
}

impl From<&EnrichedClick> for ClickNotification {
    fn from(click: &EnrichedClick) -> Self {
        Self {
            workspace_id: click.event.workspace_id.clone(),
            link_id: click.event.link_id.clone(),
            short_code: click.event.short_code.clone(),
            timestamp: click.event.timestamp,
            country: click.country.clone(),
            city: click.city.clone(),
            device: click.device.clone(),
            browser: click.browser.clone(),
            referer: click.event.referer.clone(),
        }
    }
}

/// Message sent to live viewers.
///
/// Serializes as `{"type": "click", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RealtimeMessage {
    Click(ClickNotification),
}
