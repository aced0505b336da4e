//! Core types, errors, and store capabilities for the click pipeline.

pub mod error;
pub mod events;
pub mod notification;
pub mod store;

pub use error::{Error, Result};
pub use events::*;
pub use notification::*;
pub use store::*;
