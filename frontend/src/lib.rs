//! Live operational data layer for the ride-hailing console.
//!
//! The crate caches paginated backend collections behind last-request-wins
//! page controllers, runs polling views for fleet tracking, and owns the
//! session credentials for the rider and admin authentication domains. All
//! business rules stay on the backend; this layer only fetches, normalises,
//! caches and submits.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod screens;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{ConsoleSettings, SettingsError};
