//! Console configuration loaded via OrthoConfig.
//!
//! Values come from `CONSOLE_*` environment variables, configuration files
//! and command-line flags. Accessors validate and apply defaults.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use pagination::{PageRequest, PageRequestError};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{AuthDomain, LoginCredentials, LoginValidationError};
use crate::outbound::http::BackendEndpoints;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_TRACKING_INTERVAL_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_HISTORY_LIMIT: u32 = 50;
const DEFAULT_SESSION_DIR: &str = ".console-sessions";

/// Errors raised while validating [`ConsoleSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required base URL was not configured.
    #[error("{field} is not configured")]
    MissingUrl {
        /// Setting name.
        field: &'static str,
    },
    /// A base URL did not parse.
    #[error("{field} is not a valid URL: {source}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// A base URL used something other than HTTP(S).
    #[error("{field} must use http or https, not {scheme}")]
    UnsupportedScheme {
        /// Setting name.
        field: &'static str,
        /// Offending scheme.
        scheme: String,
    },
    /// A duration or count was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Setting name.
        field: &'static str,
    },
    /// The page size was rejected.
    #[error("invalid page size: {0}")]
    Page(#[from] PageRequestError),
    /// The session directory is not valid UTF-8.
    #[error("session directory is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    /// The configured username or password was blank.
    #[error("invalid login credentials: {0}")]
    Login(#[from] LoginValidationError),
    /// Only one of username and password was configured.
    #[error("username and password must be configured together")]
    PartialLogin,
}

/// Settings for the console data layer and the fleet monitor.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CONSOLE")]
pub struct ConsoleSettings {
    /// Rider and driver API root.
    pub rider_base_url: Option<String>,
    /// Admin API root.
    pub admin_base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Fleet tracking poll interval in seconds.
    pub tracking_interval_secs: Option<u64>,
    /// Rows per page on paginated screens.
    pub page_size: Option<u32>,
    /// Trail samples fetched when a vehicle is selected.
    pub history_limit: Option<u32>,
    /// Directory holding the per-domain session files.
    pub session_dir: Option<PathBuf>,
    /// Admin username used when no session is stored.
    pub username: Option<String>,
    /// Admin password used when no session is stored.
    pub password: Option<String>,
}

impl fmt::Debug for ConsoleSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSettings")
            .field("rider_base_url", &self.rider_base_url)
            .field("admin_base_url", &self.admin_base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("tracking_interval_secs", &self.tracking_interval_secs)
            .field("page_size", &self.page_size)
            .field("history_limit", &self.history_limit)
            .field("session_dir", &self.session_dir)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ConsoleSettings {
    /// Validated base URLs for both domains.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when either URL is missing, malformed or not
    /// HTTP(S).
    pub fn endpoints(&self) -> Result<BackendEndpoints, SettingsError> {
        Ok(BackendEndpoints {
            rider: parse_base_url(
                base_url_field(AuthDomain::Rider),
                self.rider_base_url.as_deref(),
            )?,
            admin: parse_base_url(
                base_url_field(AuthDomain::Admin),
                self.admin_base_url.as_deref(),
            )?,
        })
    }

    /// Per-request timeout, 8 seconds by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero timeout.
    pub fn request_timeout(&self) -> Result<Duration, SettingsError> {
        non_zero(
            "request_timeout_ms",
            self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
        .map(Duration::from_millis)
    }

    /// Fleet tracking interval, 30 seconds by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero interval.
    pub fn tracking_interval(&self) -> Result<Duration, SettingsError> {
        non_zero(
            "tracking_interval_secs",
            self.tracking_interval_secs
                .unwrap_or(DEFAULT_TRACKING_INTERVAL_SECS),
        )
        .map(Duration::from_secs)
    }

    /// First page at the configured size, 20 rows by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Page`] for a zero size.
    pub fn first_page(&self) -> Result<PageRequest, SettingsError> {
        Ok(PageRequest::first_of(
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )?)
    }

    /// Trail length, 50 samples by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero limit.
    pub fn history_limit(&self) -> Result<u32, SettingsError> {
        non_zero(
            "history_limit",
            self.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        )
    }

    /// Session directory, `.console-sessions` by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NonUtf8Path`] when the path is not UTF-8.
    pub fn session_dir(&self) -> Result<Utf8PathBuf, SettingsError> {
        self.session_dir.clone().map_or_else(
            || Ok(Utf8PathBuf::from(DEFAULT_SESSION_DIR)),
            |path| Utf8PathBuf::from_path_buf(path).map_err(SettingsError::NonUtf8Path),
        )
    }

    /// Login credentials, when both username and password are configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PartialLogin`] when only one is set and
    /// [`SettingsError::Login`] when either is blank.
    pub fn credentials(&self) -> Result<Option<LoginCredentials>, SettingsError> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => {
                Ok(Some(LoginCredentials::try_from_parts(username, password)?))
            }
            _ => Err(SettingsError::PartialLogin),
        }
    }
}

const fn base_url_field(domain: AuthDomain) -> &'static str {
    match domain {
        AuthDomain::Rider => "rider_base_url",
        AuthDomain::Admin => "admin_base_url",
    }
}

fn parse_base_url(field: &'static str, raw: Option<&str>) -> Result<Url, SettingsError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SettingsError::MissingUrl { field })?;
    let url = Url::parse(raw).map_err(|source| SettingsError::InvalidUrl { field, source })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SettingsError::UnsupportedScheme {
            field,
            scheme: other.to_owned(),
        }),
    }
}

fn non_zero<T: PartialEq + Default>(field: &'static str, value: T) -> Result<T, SettingsError> {
    if value == T::default() {
        Err(SettingsError::Zero { field })
    } else {
        Ok(value)
    }
}
