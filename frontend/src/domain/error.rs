//! Domain-level failure taxonomy.
//!
//! Controllers translate port errors into [`DataError`] before deciding how a
//! failure is presented: reads land in the slice's `error` field, writes go
//! through the notifier and the mutation gate.

use thiserror::Error;

use crate::domain::AuthDomain;
use crate::domain::ports::RemoteError;

/// Message shown when a rejected mutation carries no server message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Failures surfaced to screens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// The domain's credential was rejected and has been destroyed.
    #[error("{domain} session expired")]
    AuthExpired {
        /// Domain whose credential was rejected.
        domain: AuthDomain,
    },
    /// Transport failure, timeout, or an unreadable body.
    #[error("network error: {message}")]
    Network {
        /// Transport diagnostic.
        message: String,
    },
    /// The backend refused the request.
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Validation {
        /// HTTP status returned by the backend.
        status: u16,
        /// Server-provided message, shown verbatim when present.
        message: Option<String>,
    },
    /// An earlier mutation failed and has not been acknowledged yet.
    #[error("acknowledge the previous error before making further changes")]
    MutationBlocked,
}

impl DataError {
    /// Return whether the failure must be handled globally as a forced logout.
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// Message suitable for a toast: the server's text verbatim, or a
    /// generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.to_owned()),
            Self::Network { .. } => GENERIC_FAILURE.to_owned(),
            other => other.to_string(),
        }
    }
}

impl From<RemoteError> for DataError {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::AuthExpired { domain } => Self::AuthExpired { domain },
            RemoteError::Network { message } => Self::Network { message },
            RemoteError::Decode { message } => Self::Network { message },
            RemoteError::Rejected { status, message } => Self::Validation { status, message },
        }
    }
}
