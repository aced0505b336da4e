//! Shared helpers for the click pipeline integration tests.

pub mod fixtures;
pub mod mocks;
pub mod setup;
