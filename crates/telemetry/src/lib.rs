//! Internal telemetry for the click pipeline.
//!
//! Metrics are kept in-process and surfaced through logs and the health
//! endpoints; no external metrics system is required.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
