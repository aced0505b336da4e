//! Test fixtures and click generators.

use chrono::Utc;
use click_core::ClickEvent;
use uuid::Uuid;

pub const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
pub const GOOGLEBOT: &str =
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
pub const CURL: &str = "curl/8.4.0";

/// A human desktop click on `link_id` with a random visitor IP.
pub fn click(workspace_id: &str, link_id: &str) -> ClickEvent {
    ClickEvent::new(link_id, workspace_id, short_code(link_id))
        .with_timestamp(Utc::now())
        .with_ip(random_ip())
        .with_user_agent(CHROME_DESKTOP)
        .with_referer("https://news.example.com/")
}

/// A click from a fixed visitor, for unique-counting tests.
pub fn click_from(workspace_id: &str, link_id: &str, ip: &str, user_agent: &str) -> ClickEvent {
    ClickEvent::new(link_id, workspace_id, short_code(link_id))
        .with_ip(ip)
        .with_user_agent(user_agent)
}

/// A crawler click.
pub fn bot_click(workspace_id: &str, link_id: &str) -> ClickEvent {
    click_from(workspace_id, link_id, &random_ip(), GOOGLEBOT)
}

/// `n` human clicks on distinct links named `{prefix}-{i}`.
pub fn clicks(workspace_id: &str, prefix: &str, n: usize) -> Vec<ClickEvent> {
    (0..n)
        .map(|i| click(workspace_id, &format!("{}-{}", prefix, i)))
        .collect()
}

/// Queue payload for a click.
pub fn payload(event: &ClickEvent) -> String {
    event.to_payload().unwrap()
}

/// Payloads that fail to deserialize as a click event.
pub fn malformed_payloads() -> Vec<String> {
    vec![
        "not json".to_string(),
        "{}".to_string(),
        r#"{"link_id": "l", "workspace_id": "w"}"#.to_string(),
        r#"{"link_id": 1, "workspace_id": "w", "short_code": "s", "timestamp": "2024-01-01T00:00:00Z"}"#
            .to_string(),
    ]
}

/// A fresh workspace id, so tests sharing global state don't collide.
pub fn workspace_id() -> String {
    format!("ws_{}", Uuid::new_v4().simple())
}

pub fn link_id() -> String {
    format!("link_{}", Uuid::new_v4().simple())
}

fn short_code(link_id: &str) -> String {
    link_id.chars().rev().take(6).collect()
}

fn random_ip() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("10.{}.{}.{}", bytes[0], bytes[1], bytes[2])
}
