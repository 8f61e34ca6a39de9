//! Shared helpers for frontend integration tests.

pub mod loopback;
