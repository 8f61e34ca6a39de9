//! Service zones. The endpoint returns every zone at once.

use serde::Deserialize;

use super::format;
use crate::domain::{EntityId, ListScreen};

/// Collection endpoint.
pub const ZONES_PATH: &str = "/admin/zones";

/// One polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeoPoint {
    /// Degrees north.
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Degrees east.
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

/// Zone as returned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRow {
    /// Backend id.
    pub id: EntityId,
    /// Zone name.
    pub name: String,
    /// City the zone belongs to.
    #[serde(default)]
    pub city: Option<String>,
    /// Fare multiplier applied inside the zone.
    #[serde(default)]
    pub surge_multiplier: Option<f64>,
    /// Boundary polygon.
    #[serde(default, alias = "coordinates")]
    pub boundary: Vec<GeoPoint>,
    /// Whether trips may start inside the zone.
    #[serde(default)]
    pub active: bool,
}

/// Row shown in the zones table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneView {
    /// Backend id.
    pub id: EntityId,
    /// `name (city)`.
    pub name: String,
    /// `x1.5`, or `x1.0` without surge.
    pub surge: String,
    /// Vertex count of the boundary.
    pub vertices: usize,
    /// Whether trips may start inside the zone.
    pub active: bool,
}

/// Unpaginated zones screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneList;

impl ListScreen for ZoneList {
    type Row = ZoneRow;
    type View = ZoneView;

    fn label(&self) -> &'static str {
        "Zone"
    }

    fn collection_path(&self) -> String {
        ZONES_PATH.to_owned()
    }

    fn plural(&self) -> &'static str {
        "zones"
    }

    fn paginated(&self) -> bool {
        false
    }

    fn project(&self, row: &ZoneRow) -> ZoneView {
        let name = match row.city.as_deref().map(str::trim) {
            Some(city) if !city.is_empty() => format!("{} ({city})", row.name),
            _ => format::text(Some(&row.name)),
        };
        ZoneView {
            id: row.id.clone(),
            name,
            surge: format!("x{:.1}", row.surge_multiplier.unwrap_or(1.0)),
            vertices: row.boundary.len(),
            active: row.active,
        }
    }
}
