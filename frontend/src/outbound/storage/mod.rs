//! Durable session storage adapters.

mod session_files;

pub use session_files::FileCredentialStore;
