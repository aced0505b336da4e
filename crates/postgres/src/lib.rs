//! PostgreSQL primary store for clicks and link counters.

pub mod config;
pub mod health;
pub mod schema;
pub mod store;

pub use config::*;
pub use store::PgPrimaryStore;
