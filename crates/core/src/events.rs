//! Click event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Raw click captured by the redirect path.
///
/// The JSON form produced by [`ClickEvent::to_payload`] is the only
/// representation that crosses the queue boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub link_id: String,
    pub workspace_id: String,
    pub short_code: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub referer: String,
}

impl ClickEvent {
    pub fn new(
        link_id: impl Into<String>,
        workspace_id: impl Into<String>,
        short_code: impl Into<String>,
    ) -> Self {
        Self {
            link_id: link_id.into(),
            workspace_id: workspace_id.into(),
            short_code: short_code.into(),
            timestamp: Utc::now(),
            ip: String::new(),
            user_agent: String::new(),
            referer: String::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    /// Serialize for the queue.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a queue payload.
    pub fn from_payload(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Geographic fields resolved from the client IP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: String,
    pub region: String,
    pub city: String,
}

/// Device class derived from the user agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
    #[default]
    Unknown,
}

impl DeviceClass {
    /// Stored form; unknown devices are stored as an empty string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Unknown => "",
        }
    }
}

/// A click plus the fields derived during enrichment.
///
/// Created once per [`ClickEvent`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedClick {
    pub event: ClickEvent,
    pub country: String,
    pub region: String,
    pub city: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device: String,
    pub is_bot: bool,
}

impl EnrichedClick {
    /// An enriched click with every derived field empty.
    pub fn bare(event: ClickEvent) -> Self {
        Self {
            event,
            country: String::new(),
            region: String::new(),
            city: String::new(),
            browser: String::new(),
            browser_version: String::new(),
            os: String::new(),
            os_version: String::new(),
            device: String::new(),
            is_bot: false,
        }
    }

    pub fn link_id(&self) -> &str {
        &self.event.link_id
    }

    pub fn workspace_id(&self) -> &str {
        &self.event.workspace_id
    }
}
