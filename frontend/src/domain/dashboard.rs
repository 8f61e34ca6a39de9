//! Independent failure domains for dashboards that fan out several fetches.

use tracing::warn;

use crate::domain::DataError;

/// Outcome of one dashboard panel once every fetch has settled.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelState<T> {
    /// The panel's data arrived.
    Ready(T),
    /// The panel's fetch failed; other panels are unaffected. `stale` holds
    /// the last value this panel showed, if any.
    Failed {
        /// Why the latest fetch failed.
        error: DataError,
        /// Data from the last successful fetch.
        stale: Option<T>,
    },
}

impl<T: Clone> PanelState<T> {
    /// Wrap a settled fetch, logging failures with the panel name.
    pub fn settle(panel: &'static str, result: Result<T, DataError>) -> Self {
        Self::settle_over(panel, result, None)
    }

    /// As [`Self::settle`], carrying the last good value of `previous`
    /// forward when this fetch failed.
    pub fn settle_over(
        panel: &'static str,
        result: Result<T, DataError>,
        previous: Option<&Self>,
    ) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(error) => {
                let stale = previous.and_then(Self::latest).cloned();
                warn!(panel, %error, has_stale = stale.is_some(), "dashboard panel failed");
                Self::Failed { error, stale }
            }
        }
    }
}

impl<T> PanelState<T> {
    /// Whether the latest fetch for the panel succeeded.
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Panel data, if the latest fetch succeeded.
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    /// Data to display: fresh when ready, otherwise the stale value.
    pub const fn latest(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed { stale, .. } => stale.as_ref(),
        }
    }

    /// Failure, if the panel failed.
    pub const fn error(&self) -> Option<&DataError> {
        match self {
            Self::Ready(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}
