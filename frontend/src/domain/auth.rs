//! Login and logout flows.
//!
//! These are the only writers of a domain's credential apart from the HTTP
//! adapter's rejection handler. Login never sends an existing bearer token so
//! a wrong password cannot expire a live session.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::domain::ports::{ApiRequest, RemoteDataClient};
use crate::domain::{AuthDomain, DataError, EntityId, Role, SessionCredential, SessionProvider};

/// Backend path for the login call.
pub const LOGIN_PATH: &str = "/login";

/// Validation errors for [`LoginCredentials`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
}

/// Username and password submitted to `POST /login`.
///
/// The username is trimmed; the password is kept exactly as typed and is
/// zeroed on drop.
///
/// # Examples
/// ```
/// use frontend::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" ops ", "pw").unwrap();
/// assert_eq!(creds.username(), "ops");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Validate raw inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            username: username.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Trimmed username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password as typed.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(alias = "token")]
    access_token: String,
    role: Value,
    #[serde(default, alias = "userId")]
    id: Option<EntityId>,
    #[serde(default)]
    username: Option<String>,
}

/// Drives the login and logout flows against the session provider.
#[derive(Clone)]
pub struct AuthFlow {
    client: Arc<dyn RemoteDataClient>,
    session: Arc<SessionProvider>,
}

impl AuthFlow {
    /// Build a flow over the given client and provider.
    pub fn new(client: Arc<dyn RemoteDataClient>, session: Arc<SessionProvider>) -> Self {
        Self { client, session }
    }

    /// Authenticate against `domain` and store the resulting credential.
    ///
    /// # Errors
    ///
    /// Bad credentials surface as [`DataError::Validation`] with the
    /// backend's message. A role the domain does not admit is rejected the
    /// same way and nothing is stored. Unreadable responses surface as
    /// [`DataError::Network`].
    pub async fn login(
        &self,
        domain: AuthDomain,
        credentials: &LoginCredentials,
    ) -> Result<SessionCredential, DataError> {
        let body = json!({
            "username": credentials.username(),
            "password": credentials.password(),
        });
        let request = ApiRequest::post(domain, LOGIN_PATH, body).without_credentials();
        let raw = self.client.request(request).await?;
        let response: LoginResponse =
            serde_json::from_value(raw).map_err(|err| DataError::Network {
                message: format!("login response: {err}"),
            })?;

        let role = admitted_role(domain, &response.role)?;
        let principal_id = response
            .id
            .map(|id| id.to_string())
            .or_else(|| jwt_subject(&response.access_token))
            .unwrap_or_else(|| credentials.username().to_owned());
        let username = response
            .username
            .or_else(|| Some(credentials.username().to_owned()));
        let credential = SessionCredential::new(response.access_token, principal_id, role, username)
            .map_err(|err| DataError::Network {
                message: format!("login response: {err}"),
            })?;

        self.session.establish(domain, credential.clone()).await;
        Ok(credential)
    }

    /// Destroy the credential for `domain`. The backend is not consulted.
    pub async fn logout(&self, domain: AuthDomain) {
        info!(%domain, "logout requested");
        self.session.sign_out(domain).await;
    }
}

fn admitted_role(domain: AuthDomain, raw: &Value) -> Result<Role, DataError> {
    let role = serde_json::from_value::<Role>(raw.clone()).ok();
    match role {
        Some(role) if domain.admits(role) => Ok(role),
        _ => {
            let shown = raw.as_str().map_or_else(|| raw.to_string(), str::to_owned);
            Err(DataError::Validation {
                status: 403,
                message: Some(format!("role {shown} cannot sign in to the {domain} console")),
            })
        }
    }
}

/// Read the `sub` claim from an unverified JWT payload.
fn jwt_subject(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| debug!(%err, "access token payload is not base64url"))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    match claims.get("sub")? {
        Value::String(sub) if !sub.trim().is_empty() => Some(sub.clone()),
        Value::Number(sub) => Some(sub.to_string()),
        _ => None,
    }
}
