//! Error envelope returned by the backend on non-success statuses.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorEnvelopeDto {
    /// Server message: `message` first, then `error`, ignoring blanks.
    pub(super) fn into_message(self) -> Option<String> {
        [self.message, self.error]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
    }

    pub(super) fn parse(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .and_then(Self::into_message)
    }
}
