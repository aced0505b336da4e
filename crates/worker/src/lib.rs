//! Background workers for the click pipeline.
//!
//! - Processor (queue → enrichment → primary store, forwarder, notifications)
//! - Enrichment (user agent, bot, geo capabilities)
//! - Forwarder (best-effort secondary analytics writes)
//! - Uniques (per-visitor dedup window for unique clicks)
//! - Scheduler (processor task and periodic health/metrics reporting)

pub mod config;
pub mod enrichment;
pub mod forwarder;
pub mod processor;
pub mod scheduler;
pub mod uniques;

pub use config::ProcessorConfig;
pub use enrichment::{
    BotDetector, Enricher, GeoLookup, NoGeoLookup, ParsedAgent, PatternBotDetector,
    UserAgentParser, WootheeParser,
};
pub use forwarder::SecondaryForwarder;
pub use processor::{BatchOutcome, ClickProcessor};
pub use scheduler::*;
pub use uniques::UniqueVisitors;
