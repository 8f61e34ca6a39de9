//! Filter sets and the request key that decides when a list is refetched.
//!
//! Keys are compared by value. Date presets are stored unresolved so that
//! "today" stays the same key for the lifetime of a screen; they are turned
//! into concrete dates only when a query is built.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use mockable::Clock;
use pagination::{ListQuery, PageRequest};

/// Filter values meaning "no filter". They are never sent to the backend.
pub const UNFILTERED: [&str; 2] = ["all", ""];

/// Screen-specific filters keyed by backend parameter name.
///
/// # Examples
/// ```
/// use frontend::domain::FilterSet;
///
/// let mut filters = FilterSet::default();
/// assert!(!filters.set("status", "all"));
/// assert!(filters.set("status", "ACTIVE"));
/// assert_eq!(filters.get("status"), Some("ACTIVE"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSet {
    values: BTreeMap<String, String>,
}

impl FilterSet {
    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set `name` to `value`, treating `"all"` and blank values as removal.
    /// Returns whether the set changed.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        let value = value.into();
        let trimmed = value.trim();
        if UNFILTERED.contains(&trimmed) {
            return self.values.remove(&name).is_some();
        }
        if self.values.get(&name).map(String::as_str) == Some(trimmed) {
            return false;
        }
        self.values.insert(name, trimmed.to_owned());
        true
    }

    /// Remove `name`. Returns whether the set changed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether no filter is active.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Active filters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Inclusive calendar range sent as two filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    /// First day included.
    pub from: NaiveDate,
    /// Last day included.
    pub to: NaiveDate,
}

/// Date filter presets offered by list screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DateFilter {
    /// No date restriction.
    #[default]
    Any,
    /// The current UTC day.
    Today,
    /// Today and the six days before it.
    Last7Days,
    /// Today and the 29 days before it.
    Last30Days,
    /// Explicit inclusive range.
    Custom(DateRange),
}

impl DateFilter {
    /// Resolve against `clock`. [`DateFilter::Any`] resolves to `None`.
    pub fn resolve(self, clock: &dyn Clock) -> Option<DateRange> {
        let today = clock.utc().date_naive();
        let back = |days: u64| DateRange {
            from: today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN),
            to: today,
        };
        match self {
            Self::Any => None,
            Self::Today => Some(back(0)),
            Self::Last7Days => Some(back(6)),
            Self::Last30Days => Some(back(29)),
            Self::Custom(range) => Some(range),
        }
    }
}

/// Query parameter names a screen uses for a resolved [`DateRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParams {
    /// Parameter carrying the first day.
    pub from: &'static str,
    /// Parameter carrying the last day.
    pub to: &'static str,
}

impl Default for DateParams {
    fn default() -> Self {
        Self {
            from: "startDate",
            to: "endDate",
        }
    }
}

/// Everything that determines which backend result a list screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Non-pagination filters.
    pub filters: FilterSet,
    /// Date preset, kept unresolved.
    pub date: DateFilter,
    /// Page, for paginated screens.
    pub page: Option<PageRequest>,
}

impl RequestKey {
    /// Key for the first page with no filters.
    pub fn initial(page: Option<PageRequest>) -> Self {
        Self {
            filters: FilterSet::default(),
            date: DateFilter::Any,
            page,
        }
    }

    /// Reset the page to 0, keeping its size.
    pub(crate) fn rewind(&mut self) {
        self.page = self.page.map(PageRequest::first);
    }

    /// Build the backend query: page and size first, then filters, then the
    /// resolved date range.
    pub fn to_query(&self, clock: &dyn Clock, params: DateParams) -> ListQuery {
        let mut query = match self.page {
            Some(page) => ListQuery::paged(page),
            None => ListQuery::unpaged(),
        };
        for (name, value) in self.filters.iter() {
            query = query.with_filter(name, value);
        }
        if let Some(range) = self.date.resolve(clock) {
            query = query
                .with_filter(params.from, iso_date(range.from))
                .with_filter(params.to, iso_date(range.to));
        }
        query
    }
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
