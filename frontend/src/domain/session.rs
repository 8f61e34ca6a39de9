//! Session credentials and the provider that owns them.
//!
//! There is one credential slot per [`AuthDomain`]. Every controller reads
//! through [`SessionProvider`]; only the login/logout flow and the remote
//! client's 401/403 handler may write, and those write paths are crate-private.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::domain::ports::{CredentialStore, StoredCredential};

const FINGERPRINT_BYTES: usize = 8;
const EVENT_CAPACITY: usize = 16;

/// Independent credential scope. Rider/driver and admin sessions coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthDomain {
    /// End-user and driver dashboards.
    Rider,
    /// Admin dashboards.
    Admin,
}

impl AuthDomain {
    /// Every domain, in a stable order.
    pub const ALL: [Self; 2] = [Self::Rider, Self::Admin];

    /// Return whether a principal with `role` may hold a session here.
    pub const fn admits(self, role: Role) -> bool {
        match self {
            Self::Rider => matches!(role, Role::NormalUser | Role::Driver),
            Self::Admin => matches!(role, Role::Admin | Role::SuperAdmin),
        }
    }

    /// Lower-case name used in logs and storage file names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AuthDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Rider account.
    NormalUser,
    /// Driver account.
    Driver,
    /// Operator with admin dashboard access.
    Admin,
    /// Operator with unrestricted admin access.
    SuperAdmin,
}

/// Validation errors for [`SessionCredential`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialValidationError {
    /// The access token was blank.
    #[error("access token must not be empty")]
    EmptyToken,
    /// No principal id could be determined.
    #[error("principal id must not be empty")]
    EmptyPrincipal,
}

/// An authenticated principal for one domain.
///
/// ## Invariants
/// - `token` and `principal_id` are non-empty.
/// - The token is zeroed when the credential is dropped and never appears in
///   `Debug` output.
///
/// # Examples
/// ```
/// use frontend::domain::{Role, SessionCredential};
///
/// let credential = SessionCredential::new("tok", "42", Role::Admin, Some("ops".into())).unwrap();
/// assert_eq!(credential.role(), Role::Admin);
/// assert!(!format!("{credential:?}").contains("tok\""));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    token: Zeroizing<String>,
    principal_id: String,
    role: Role,
    username: Option<String>,
}

impl SessionCredential {
    /// Build a credential, rejecting blank tokens or principals.
    pub fn new(
        token: impl Into<String>,
        principal_id: impl Into<String>,
        role: Role,
        username: Option<String>,
    ) -> Result<Self, CredentialValidationError> {
        let token = Zeroizing::new(token.into());
        if token.trim().is_empty() {
            return Err(CredentialValidationError::EmptyToken);
        }
        let principal_id = principal_id.into();
        if principal_id.trim().is_empty() {
            return Err(CredentialValidationError::EmptyPrincipal);
        }
        Ok(Self {
            token,
            principal_id,
            role,
            username,
        })
    }

    /// Bearer token presented to the backend.
    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    /// Backend principal id.
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Principal role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Login name, when the backend reported one.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Short, non-reversible identifier for log lines.
    pub fn fingerprint(&self) -> String {
        token_fingerprint(self.token())
    }

    pub(crate) fn to_stored(&self) -> StoredCredential {
        StoredCredential {
            token: self.token().to_owned(),
            role: self.role,
            username: self.username.clone(),
            principal_id: self.principal_id.clone(),
        }
    }

    pub(crate) fn from_stored(
        stored: StoredCredential,
    ) -> Result<Self, CredentialValidationError> {
        let StoredCredential {
            token,
            role,
            username,
            principal_id,
        } = stored;
        Self::new(token, principal_id, role, username)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &format_args!("<{}>", self.fingerprint()))
            .field("principal_id", &self.principal_id)
            .field("role", &self.role)
            .field("username", &self.username)
            .finish()
    }
}

/// Truncated SHA-256 of a token as 16 hex characters.
///
/// # Examples
/// ```
/// use frontend::domain::token_fingerprint;
///
/// let fp = token_fingerprint("secret-token");
/// assert_eq!(fp.len(), 16);
/// assert_eq!(fp, token_fingerprint("secret-token"));
/// ```
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

/// Session transitions broadcast to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login stored a new credential.
    SignedIn {
        /// Affected domain.
        domain: AuthDomain,
        /// Role of the new principal.
        role: Role,
    },
    /// The user logged out.
    SignedOut {
        /// Affected domain.
        domain: AuthDomain,
    },
    /// The backend rejected the credential; the host should redirect to login.
    Expired {
        /// Affected domain.
        domain: AuthDomain,
    },
}

/// Process-wide owner of the session credentials.
pub struct SessionProvider {
    credentials: RwLock<BTreeMap<AuthDomain, SessionCredential>>,
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionProvider {
    /// Build a provider with no active sessions.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            credentials: RwLock::new(BTreeMap::new()),
            store,
            events,
        }
    }

    /// Build a provider and restore any credentials held by `store`.
    ///
    /// Unreadable or invalid stored credentials are logged and treated as
    /// signed out.
    pub async fn rehydrate(store: Arc<dyn CredentialStore>) -> Self {
        let provider = Self::new(store);
        for domain in AuthDomain::ALL {
            let stored = match provider.store.load(domain).await {
                Ok(Some(stored)) => stored,
                Ok(None) => continue,
                Err(error) => {
                    warn!(%domain, %error, "stored session could not be loaded");
                    continue;
                }
            };
            match SessionCredential::from_stored(stored) {
                Ok(credential) => {
                    info!(%domain, fingerprint = %credential.fingerprint(), "session restored");
                    provider.write_slots().insert(domain, credential);
                }
                Err(error) => warn!(%domain, %error, "stored session is invalid"),
            }
        }
        provider
    }

    /// Snapshot of the credential for `domain`.
    pub fn current(&self, domain: AuthDomain) -> Option<SessionCredential> {
        self.read_slots().get(&domain).cloned()
    }

    /// Bearer token for `domain`, if signed in.
    pub fn bearer_token(&self, domain: AuthDomain) -> Option<Zeroizing<String>> {
        self.read_slots()
            .get(&domain)
            .map(|credential| credential.token.clone())
    }

    /// Role of the principal signed in to `domain`.
    pub fn role(&self, domain: AuthDomain) -> Option<Role> {
        self.read_slots().get(&domain).map(SessionCredential::role)
    }

    /// Return whether `domain` has an active credential.
    pub fn is_signed_in(&self, domain: AuthDomain) -> bool {
        self.read_slots().contains_key(&domain)
    }

    /// Subscribe to session transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) async fn establish(&self, domain: AuthDomain, credential: SessionCredential) {
        let stored = credential.to_stored();
        let role = credential.role();
        info!(%domain, fingerprint = %credential.fingerprint(), ?role, "session established");
        self.write_slots().insert(domain, credential);
        if let Err(error) = self.store.save(domain, &stored).await {
            warn!(%domain, %error, "session kept in memory only");
        }
        self.publish(SessionEvent::SignedIn { domain, role });
    }

    pub(crate) async fn sign_out(&self, domain: AuthDomain) {
        if self.write_slots().remove(&domain).is_some() {
            info!(%domain, "session signed out");
        }
        self.clear_store(domain).await;
        self.publish(SessionEvent::SignedOut { domain });
    }

    /// Destroy the credential for `domain` if it still holds `presented`.
    ///
    /// A rejection for a token that has since been replaced by a fresh login
    /// leaves the new credential alone.
    pub(crate) async fn expire(&self, domain: AuthDomain, presented: &str) {
        let removed = {
            let mut slots = self.write_slots();
            match slots.get(&domain) {
                Some(current) if current.token() == presented => slots.remove(&domain),
                _ => None,
            }
        };
        let Some(credential) = removed else {
            return;
        };
        warn!(%domain, fingerprint = %credential.fingerprint(), "session rejected by backend");
        self.clear_store(domain).await;
        self.publish(SessionEvent::Expired { domain });
    }

    async fn clear_store(&self, domain: AuthDomain) {
        if let Err(error) = self.store.clear(domain).await {
            warn!(%domain, %error, "stored session could not be cleared");
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is normal for headless use.
        let _ = self.events.send(event);
    }

    fn read_slots(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, BTreeMap<AuthDomain, SessionCredential>> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, BTreeMap<AuthDomain, SessionCredential>> {
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
