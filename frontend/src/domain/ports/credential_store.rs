//! Driven port for durable session storage.
//!
//! Only the session credential fields survive a restart; everything else is
//! rebuilt from the backend.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::define_port_error;
use crate::domain::{AuthDomain, Role};

/// Persisted form of one domain's credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    /// Bearer token.
    pub token: String,
    /// Principal role.
    pub role: Role,
    /// Login name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Backend principal id.
    pub principal_id: String,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("role", &self.role)
            .field("username", &self.username)
            .field("principal_id", &self.principal_id)
            .finish_non_exhaustive()
    }
}

define_port_error! {
    /// Errors raised by credential storage adapters.
    pub enum CredentialStoreError {
        /// The storage medium could not be read or written.
        Io { message: String } => "credential storage failed: {message}",
        /// A stored record exists but cannot be decoded.
        Corrupt { message: String } => "stored credential is unreadable: {message}",
    }
}

/// Port for loading and persisting session credentials per domain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential for `domain`, if one was stored.
    async fn load(
        &self,
        domain: AuthDomain,
    ) -> Result<Option<StoredCredential>, CredentialStoreError>;

    /// Replace the credential stored for `domain`.
    async fn save(
        &self,
        domain: AuthDomain,
        credential: &StoredCredential,
    ) -> Result<(), CredentialStoreError>;

    /// Remove the credential stored for `domain`. Removing nothing succeeds.
    async fn clear(&self, domain: AuthDomain) -> Result<(), CredentialStoreError>;
}

/// Volatile store used when nothing should outlive the process.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<BTreeMap<AuthDomain, StoredCredential>>,
}

impl InMemoryCredentialStore {
    /// Seed the store with a credential for `domain`.
    pub fn with_entry(self, domain: AuthDomain, credential: StoredCredential) -> Self {
        self.lock().insert(domain, credential);
        self
    }

    /// Current stored value for `domain`.
    pub fn entry(&self, domain: AuthDomain) -> Option<StoredCredential> {
        self.lock().get(&domain).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<AuthDomain, StoredCredential>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(
        &self,
        domain: AuthDomain,
    ) -> Result<Option<StoredCredential>, CredentialStoreError> {
        Ok(self.entry(domain))
    }

    async fn save(
        &self,
        domain: AuthDomain,
        credential: &StoredCredential,
    ) -> Result<(), CredentialStoreError> {
        self.lock().insert(domain, credential.clone());
        Ok(())
    }

    async fn clear(&self, domain: AuthDomain) -> Result<(), CredentialStoreError> {
        self.lock().remove(&domain);
        Ok(())
    }
}
