//! Trip demand heatmap. Refetches only when a query is submitted.

use serde::Deserialize;

use crate::domain::{EntityId, RecordScreen};

/// Heatmap endpoint.
pub const HEATMAP_PATH: &str = "/admin/analytics/heatmap";

/// Filter parameter names accepted by the heatmap endpoint.
pub mod filters {
    /// Restrict to one zone id.
    pub const ZONE: &str = "zoneId";
    /// Restrict to one vehicle class.
    pub const VEHICLE_TYPE: &str = "vehicleType";
}

/// One weighted cell.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HeatPoint {
    /// Degrees north.
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Degrees east.
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    /// Trip requests in the cell.
    #[serde(default = "unit_weight", alias = "count", alias = "intensity")]
    pub weight: f64,
}

const fn unit_weight() -> f64 {
    1.0
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeatmapWire {
    Bare(Vec<HeatPoint>),
    Keyed {
        #[serde(alias = "heatmap", alias = "data")]
        points: Vec<HeatPoint>,
        #[serde(default, alias = "zoneId")]
        zone: Option<EntityId>,
    },
}

/// Heatmap document, accepted as a bare array or under a `points` key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HeatmapWire")]
pub struct HeatmapData {
    /// Weighted cells.
    pub points: Vec<HeatPoint>,
    /// Zone the backend scoped the result to, if any.
    pub zone: Option<EntityId>,
}

impl From<HeatmapWire> for HeatmapData {
    fn from(wire: HeatmapWire) -> Self {
        match wire {
            HeatmapWire::Bare(points) => Self { points, zone: None },
            HeatmapWire::Keyed { points, zone } => Self { points, zone },
        }
    }
}

impl HeatmapData {
    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 {
        self.points.iter().map(|point| point.weight).sum()
    }

    /// The `limit` heaviest cells, heaviest first.
    pub fn hottest(&self, limit: usize) -> Vec<HeatPoint> {
        let mut sorted = self.points.clone();
        sorted.sort_by(|left, right| right.weight.total_cmp(&left.weight));
        sorted.truncate(limit);
        sorted
    }
}

/// Heatmap query screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatmapScreen;

impl RecordScreen for HeatmapScreen {
    type Value = HeatmapData;

    fn label(&self) -> &'static str {
        "Heatmap"
    }

    fn path(&self) -> String {
        HEATMAP_PATH.to_owned()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::HttpMethod;
    use crate::domain::{DateFilter, DateRange, FilterSet, RecordController};
    use crate::test_support::{RecordingNotifier, StubRemoteClient, stub_ports};
    use chrono::NaiveDate;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case(json!([{ "lat": 6.5, "lng": 3.3, "count": 4 }]))]
    #[case(json!({ "points": [{ "latitude": 6.5, "longitude": 3.3, "weight": 4 }] }))]
    #[case(json!({ "data": { "heatmap": [{ "lat": 6.5, "lon": 3.3, "intensity": 4 }] } }))]
    fn heatmap_shapes_decode(#[case] raw: Value) {
        let decoded: HeatmapData = serde_json::from_value(raw.clone())
            .or_else(|_| serde_json::from_value(raw["data"].clone()))
            .expect("decodes");
        assert_eq!(decoded.points.len(), 1);
        assert!((decoded.total_weight() - 4.0).abs() < f64::EPSILON);
    }

    #[rstest]
    fn hottest_orders_by_weight() {
        let data: HeatmapData = serde_json::from_value(json!([
            { "lat": 1.0, "lng": 1.0, "weight": 2 },
            { "lat": 2.0, "lng": 2.0, "weight": 9 },
            { "lat": 3.0, "lng": 3.0 }
        ]))
        .expect("decodes");

        let top = data.hottest(2);

        assert_eq!(top.len(), 2);
        assert!((top[0].weight - 9.0).abs() < f64::EPSILON);
        assert!((top[1].weight - 2.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[tokio::test]
    async fn submit_sends_filters_and_range_every_time() {
        let client = StubRemoteClient::new();
        client.always(HttpMethod::Get, HEATMAP_PATH, Ok(json!([])));
        let heatmap =
            RecordController::new(HeatmapScreen, stub_ports(&client, &RecordingNotifier::new()));
        heatmap.load().await;
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"),
            to: NaiveDate::from_ymd_opt(2026, 3, 7).expect("date"),
        };
        let query = FilterSet::default().with(filters::ZONE, "12");

        heatmap
            .submit(query.clone(), DateFilter::Custom(range))
            .await;
        heatmap.submit(query, DateFilter::Custom(range)).await;

        let sent = client.requests_to(HttpMethod::Get, HEATMAP_PATH);
        assert_eq!(sent.len(), 3);
        let last = sent.last().expect("a request");
        assert_eq!(last.query_value("zoneId"), Some("12"));
        assert_eq!(last.query_value("startDate"), Some("2026-03-01"));
        assert_eq!(last.query_value("endDate"), Some("2026-03-07"));
    }
}
