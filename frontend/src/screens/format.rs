//! Formatting helpers shared by view projections. All pure.

use chrono::{DateTime, Utc};

/// Placeholder for missing values.
pub const MISSING: &str = "-";

/// `YYYY-MM-DD HH:MM` in UTC, or the placeholder.
pub fn timestamp(value: Option<&DateTime<Utc>>) -> String {
    value.map_or_else(
        || MISSING.to_owned(),
        |value| value.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// `YYYY-MM-DD` in UTC, or the placeholder.
pub fn day(value: Option<&DateTime<Utc>>) -> String {
    value.map_or_else(
        || MISSING.to_owned(),
        |value| value.format("%Y-%m-%d").to_string(),
    )
}

/// Two-decimal amount, or the placeholder.
pub fn amount(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_owned(), |value| format!("{value:.2}"))
}

/// Trimmed text, or the placeholder when blank.
pub fn text(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map_or_else(|| MISSING.to_owned(), str::to_owned)
}

/// Keep the first `visible` characters of a secret-ish value and mask the
/// rest, e.g. phone numbers in exported rows.
pub fn masked(value: &str, visible: usize) -> String {
    let shown: String = value.chars().take(visible).collect();
    let hidden = value.chars().count().saturating_sub(visible);
    format!("{shown}{}", "*".repeat(hidden))
}
