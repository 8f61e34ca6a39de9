//! Typed decoding of normalised list envelopes.

use pagination::{EnvelopeShape, normalize_list};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Rows of one list response, decoded into a screen's row type.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    /// Rows that decoded successfully, in backend order.
    pub items: Vec<T>,
    /// Total reported by the backend.
    pub total: u64,
    /// Envelope the rows arrived in.
    pub shape: EnvelopeShape,
}

/// Normalise `raw` and decode each row as `T`.
///
/// An unrecognised envelope yields an empty page plus a warning. Rows that do
/// not decode are skipped with a warning; the reported total is kept as is.
pub fn decode_list<T: DeserializeOwned>(raw: &Value, plural: &str) -> ListPage<T> {
    let normalized = normalize_list(raw, plural);
    if normalized.shape.is_unrecognised() {
        warn!(
            plural,
            body_kind = value_kind(raw),
            "list response matched no known envelope"
        );
    }
    let mut items = Vec::with_capacity(normalized.items.len());
    for (index, row) in normalized.items.into_iter().enumerate() {
        match serde_json::from_value::<T>(row) {
            Ok(item) => items.push(item),
            Err(error) => warn!(plural, index, %error, "skipping undecodable row"),
        }
    }
    ListPage {
        items,
        total: normalized.total,
        shape: normalized.shape,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
