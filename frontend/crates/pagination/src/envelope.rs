//! Ordered matcher chain for list response envelopes.
//!
//! The precedence is fixed: a bare array wins over everything, a `content`
//! array wins over keyed fields, and anything that is not an object degrades
//! to an empty [`EnvelopeShape::Unrecognised`] result. Nothing here panics.

use serde::Serialize;
use serde_json::{Map, Value};

/// Total-count fields consulted in order when an envelope carries a count.
pub const TOTAL_FIELDS: [&str; 3] = ["totalElements", "total", "count"];

/// Which matcher recognised a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeShape {
    /// The body was itself an array of rows.
    #[default]
    BareArray,
    /// Rows were found under `content`.
    Content,
    /// The body was an object; rows came from `data` or the entity plural.
    Keyed,
    /// No matcher applied. Callers log this as a shape error and show an
    /// empty, successful result.
    Unrecognised,
}

impl EnvelopeShape {
    /// Return whether the body failed to match every known envelope.
    #[must_use]
    pub const fn is_unrecognised(self) -> bool {
        matches!(self, Self::Unrecognised)
    }
}

/// Rows and total count extracted from a list response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedList {
    /// Raw rows in backend order.
    pub items: Vec<Value>,
    /// Total matching rows reported by the backend, or the row count.
    pub total: u64,
    /// Matcher that produced this result.
    pub shape: EnvelopeShape,
}

impl NormalizedList {
    fn unrecognised() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            shape: EnvelopeShape::Unrecognised,
        }
    }
}

/// Normalise any list response body into rows plus a total.
///
/// `plural` is the entity collection name some endpoints use as the row key,
/// for example `"users"` or `"coupons"`.
///
/// # Examples
///
/// ```
/// use pagination::{EnvelopeShape, normalize_list};
/// use serde_json::json;
///
/// let bare = normalize_list(&json!([{ "id": 1 }, { "id": 2 }]), "users");
/// assert_eq!((bare.items.len(), bare.total), (2, 2));
///
/// let keyed = normalize_list(&json!({ "users": [{ "id": 3 }], "count": 40 }), "users");
/// assert_eq!(keyed.shape, EnvelopeShape::Keyed);
/// assert_eq!(keyed.total, 40);
///
/// let odd = normalize_list(&json!("nope"), "users");
/// assert!(odd.shape.is_unrecognised());
/// ```
#[must_use]
pub fn normalize_list(raw: &Value, plural: &str) -> NormalizedList {
    if let Some(rows) = raw.as_array() {
        return NormalizedList {
            total: row_count(rows),
            items: rows.clone(),
            shape: EnvelopeShape::BareArray,
        };
    }

    let Some(object) = raw.as_object() else {
        return NormalizedList::unrecognised();
    };

    if let Some(rows) = object.get("content").and_then(Value::as_array) {
        return NormalizedList {
            total: reported_total(object).unwrap_or_else(|| row_count(rows)),
            items: rows.clone(),
            shape: EnvelopeShape::Content,
        };
    }

    let rows = object
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| object.get(plural).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default();
    NormalizedList {
        total: reported_total(object).unwrap_or_else(|| row_count(&rows)),
        items: rows,
        shape: EnvelopeShape::Keyed,
    }
}

fn reported_total(object: &Map<String, Value>) -> Option<u64> {
    TOTAL_FIELDS
        .iter()
        .find_map(|field| object.get(*field).and_then(Value::as_u64))
}

fn row_count(rows: &[Value]) -> u64 {
    u64::try_from(rows.len()).unwrap_or(u64::MAX)
}
