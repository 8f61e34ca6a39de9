//! Opaque backend-assigned identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Identifier assigned by the backend. The client never invents one.
///
/// Some endpoints use integer keys, others string keys; both are accepted
/// and rendered the same way in paths.
///
/// # Examples
/// ```
/// use frontend::domain::EntityId;
///
/// let numeric: EntityId = serde_json::from_str("42").unwrap();
/// let textual: EntityId = serde_json::from_str("\"bus-7\"").unwrap();
/// assert_eq!(numeric.to_string(), "42");
/// assert_eq!(textual.to_string(), "bus-7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Integer key.
    Int(i64),
    /// String key.
    Str(String),
}

impl EntityId {
    /// The id as a single URL path segment. Reserved characters in string
    /// keys are percent-encoded so the id cannot alter the request target.
    ///
    /// ```
    /// use frontend::domain::EntityId;
    ///
    /// assert_eq!(EntityId::from("a/b c").path_segment(), "a%2Fb%20c");
    /// ```
    pub fn path_segment(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Str(value) => form_urlencoded::byte_serialize(value.as_bytes())
                .collect::<String>()
                .replace('+', "%20"),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EntityId::from(42), "42")]
    #[case(EntityId::from("bus-7"), "bus-7")]
    #[case(EntityId::from("a/b"), "a%2Fb")]
    #[case(EntityId::from("x?limit=1#top"), "x%3Flimit%3D1%23top")]
    #[case(EntityId::from("C+D E"), "C%2BD%20E")]
    fn path_segment_cannot_escape_its_segment(#[case] id: EntityId, #[case] expected: &str) {
        assert_eq!(id.path_segment(), expected);
    }
}
