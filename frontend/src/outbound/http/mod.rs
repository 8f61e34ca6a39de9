//! HTTP adapter for the backend REST API.

mod client;
mod dto;

pub use client::{BackendEndpoints, HttpRemoteClient};
