//! Outbound adapters implementing domain ports.
//!
//! - **http**: reqwest-backed [`RemoteDataClient`](crate::domain::ports::RemoteDataClient)
//! - **storage**: cap-std session files behind
//!   [`CredentialStore`](crate::domain::ports::CredentialStore)
//! - **notify**: tracing-backed toast sink
//!
//! Adapters translate between domain types and transport details only.

pub mod http;
pub mod notify;
pub mod storage;
