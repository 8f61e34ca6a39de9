//! Trip lists: the admin trip log and the rider's own trip history.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::format;
use crate::domain::{AuthDomain, DateParams, EntityId, ListScreen};

/// Admin collection endpoint.
pub const TRIPS_PATH: &str = "/admin/trips";
/// Rider-domain history endpoint.
pub const RIDER_TRIPS_PATH: &str = "/trips/history";

/// Trip as returned by either endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRow {
    /// Backend id.
    pub id: EntityId,
    /// Rider display name.
    #[serde(default)]
    pub rider_name: Option<String>,
    /// Driver display name, absent until matched.
    #[serde(default)]
    pub driver_name: Option<String>,
    /// Pickup address.
    #[serde(default)]
    pub pickup_address: Option<String>,
    /// Drop-off address.
    #[serde(default, alias = "destinationAddress")]
    pub dropoff_address: Option<String>,
    /// Trip status, e.g. `REQUESTED`, `IN_PROGRESS`, `COMPLETED`.
    #[serde(default)]
    pub status: Option<String>,
    /// Fare computed by the backend.
    #[serde(default, alias = "amount")]
    pub fare: Option<f64>,
    /// Distance in kilometres.
    #[serde(default)]
    pub distance_km: Option<f64>,
    /// Request time.
    #[serde(default, alias = "createdAt")]
    pub requested_at: Option<DateTime<Utc>>,
}

/// Row shown in trip tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripView {
    /// Backend id.
    pub id: EntityId,
    /// `pickup -> drop-off`.
    pub route: String,
    /// Rider name.
    pub rider: String,
    /// Driver name, or "Unassigned".
    pub driver: String,
    /// Status label with underscores turned into spaces.
    pub status: String,
    /// Two-decimal fare.
    pub fare: String,
    /// Request time.
    pub requested: String,
}

fn project_trip(row: &TripRow) -> TripView {
    TripView {
        id: row.id.clone(),
        route: format!(
            "{} -> {}",
            format::text(row.pickup_address.as_deref()),
            format::text(row.dropoff_address.as_deref())
        ),
        rider: format::text(row.rider_name.as_deref()),
        driver: row
            .driver_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Unassigned".to_owned()),
        status: row
            .status
            .as_deref()
            .map_or_else(|| format::MISSING.to_owned(), |status| status.replace('_', " ")),
        fare: format::amount(row.fare),
        requested: format::timestamp(row.requested_at.as_ref()),
    }
}

/// Paginated admin trip log with status and date filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TripList;

impl ListScreen for TripList {
    type Row = TripRow;
    type View = TripView;

    fn label(&self) -> &'static str {
        "Trip"
    }

    fn collection_path(&self) -> String {
        TRIPS_PATH.to_owned()
    }

    fn plural(&self) -> &'static str {
        "trips"
    }

    fn date_params(&self) -> DateParams {
        DateParams {
            from: "startDate",
            to: "endDate",
        }
    }

    fn project(&self, row: &TripRow) -> TripView {
        project_trip(row)
    }
}

/// The signed-in rider's or driver's own trips.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiderTripHistory;

impl ListScreen for RiderTripHistory {
    type Row = TripRow;
    type View = TripView;

    fn label(&self) -> &'static str {
        "Trip"
    }

    fn domain(&self) -> AuthDomain {
        AuthDomain::Rider
    }

    fn collection_path(&self) -> String {
        RIDER_TRIPS_PATH.to_owned()
    }

    fn plural(&self) -> &'static str {
        "trips"
    }

    fn date_params(&self) -> DateParams {
        DateParams {
            from: "from",
            to: "to",
        }
    }

    fn project(&self, row: &TripRow) -> TripView {
        project_trip(row)
    }
}
