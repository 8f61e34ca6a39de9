//! Screen definitions: entity rows, pure view projections and the request
//! paths each dashboard screen uses.
//!
//! Screens compose domain controllers; they never touch transport details.

pub mod analytics;
pub mod coupons;
pub mod drivers;
pub mod format;
pub mod heatmap;
pub mod school;
pub mod settings;
pub mod tracking;
pub mod trips;
pub mod users;
pub mod zones;
