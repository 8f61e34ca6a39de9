//! Live fleet tracking.
//!
//! Active positions are polled through a [`PollingView`]. Selecting a vehicle
//! fetches its recent trail on a separate slice; selections follow
//! last-request-wins and never touch the polling timer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pagination::normalize_list;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::ports::{ApiRequest, RemoteDataClient};
use crate::domain::{
    AuthDomain, DataError, EntityId, FetchOutcome, Liveness, PollSource, PollState, PollingView,
    Record, RecordSlice, decode_list,
};

/// Active positions endpoint.
pub const ACTIVE_PATH: &str = "/tracking/active";

const ROW_KEY: &str = "locations";
const ENTITY_FIELDS: [&str; 4] = ["driverId", "entityId", "userId", "id"];

/// One reported position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    /// Degrees north.
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Degrees east.
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    /// Compass heading in degrees.
    #[serde(default, alias = "bearing")]
    pub heading: Option<f64>,
    /// Ground speed.
    #[serde(default, alias = "speed")]
    pub speed_kmh: Option<f64>,
    /// Report time.
    #[serde(default, alias = "timestamp", alias = "updatedAt")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Trip status of the vehicle, when reported.
    #[serde(default)]
    pub status: Option<String>,
}

/// Latest position per tracked entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetSnapshot {
    positions: BTreeMap<EntityId, LocationSample>,
}

impl FleetSnapshot {
    /// Latest position of `entity`.
    pub fn position(&self, entity: &EntityId) -> Option<&LocationSample> {
        self.positions.get(entity)
    }

    /// Tracked entities.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing is being tracked.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions in entity order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &LocationSample)> {
        self.positions.iter()
    }

    /// Entities whose last report is older than `max_age` at `now`, or that
    /// never reported a time.
    pub fn stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> Vec<EntityId> {
        self.positions
            .iter()
            .filter(|(_, sample)| {
                sample
                    .recorded_at
                    .is_none_or(|recorded| now.signed_duration_since(recorded) > max_age)
            })
            .map(|(entity, _)| entity.clone())
            .collect()
    }

    fn record(&mut self, entity: EntityId, sample: LocationSample) {
        match self.positions.get(&entity) {
            Some(existing) if existing.recorded_at > sample.recorded_at => {}
            _ => {
                self.positions.insert(entity, sample);
            }
        }
    }
}

/// [`PollSource`] for the active fleet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveFleet;

impl PollSource for ActiveFleet {
    type Snapshot = FleetSnapshot;

    fn label(&self) -> &'static str {
        "active-fleet"
    }

    fn request(&self) -> ApiRequest {
        ApiRequest::get(AuthDomain::Admin, ACTIVE_PATH)
    }

    fn decode(&self, raw: Value) -> Result<FleetSnapshot, DataError> {
        Ok(decode_active(raw))
    }
}

/// Accepts a list envelope of samples carrying their own entity id, or an
/// object keyed by entity id.
fn decode_active(raw: Value) -> FleetSnapshot {
    let rows: Vec<(Option<EntityId>, Value)> = match raw {
        Value::Object(map) if is_keyed_by_entity(&map) => map
            .into_iter()
            .map(|(key, row)| (Some(entity_from_key(&key)), row))
            .collect(),
        other => {
            let normalized = normalize_list(&other, ROW_KEY);
            if normalized.shape.is_unrecognised() {
                warn!(path = ACTIVE_PATH, "active fleet response matched no known shape");
            }
            normalized.items.into_iter().map(|row| (None, row)).collect()
        }
    };

    let mut snapshot = FleetSnapshot::default();
    for (index, (key, row)) in rows.into_iter().enumerate() {
        let Some(entity) = key.or_else(|| entity_in_row(&row)) else {
            warn!(index, "skipping position without an entity id");
            continue;
        };
        match serde_json::from_value::<LocationSample>(row) {
            Ok(sample) => snapshot.record(entity, sample),
            Err(error) => warn!(index, %entity, %error, "skipping undecodable position"),
        }
    }
    snapshot
}

fn is_keyed_by_entity(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.values().all(|value| {
            value
                .as_object()
                .is_some_and(|row| row.contains_key("latitude") || row.contains_key("lat"))
        })
}

fn entity_from_key(key: &str) -> EntityId {
    key.parse::<i64>()
        .map_or_else(|_| EntityId::from(key), EntityId::from)
}

fn entity_in_row(row: &Value) -> Option<EntityId> {
    ENTITY_FIELDS
        .iter()
        .filter_map(|field| row.get(*field))
        .find_map(|value| serde_json::from_value::<EntityId>(value.clone()).ok())
}

/// Recent positions of the selected entity, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    /// Entity the trail belongs to.
    pub entity: EntityId,
    /// Samples, oldest first.
    pub samples: Vec<LocationSample>,
}

struct Selection {
    entity: Option<EntityId>,
    latest_ticket: u64,
}

struct TrackingInner {
    view: PollingView<ActiveFleet>,
    client: Arc<dyn RemoteDataClient>,
    history_limit: u32,
    trail: RecordSlice<Trail>,
    selection: Mutex<Selection>,
    liveness: Liveness,
}

/// Fleet tracking screen.
#[derive(Clone)]
pub struct FleetTracking {
    inner: Arc<TrackingInner>,
}

impl FleetTracking {
    /// Build an unmounted screen polling every `interval` and fetching up to
    /// `history_limit` trail samples per selection.
    pub fn new(client: Arc<dyn RemoteDataClient>, interval: Duration, history_limit: u32) -> Self {
        Self {
            inner: Arc::new(TrackingInner {
                view: PollingView::new(ActiveFleet, Arc::clone(&client), interval),
                client,
                history_limit,
                trail: RecordSlice::default(),
                selection: Mutex::new(Selection {
                    entity: None,
                    latest_ticket: 0,
                }),
                liveness: Liveness::default(),
            }),
        }
    }

    /// Start polling.
    pub fn mount(&self) {
        self.inner.view.mount();
    }

    /// Stop polling and drop pending trail fetches. Final.
    pub fn unmount(&self) {
        self.inner.view.unmount();
        self.inner.liveness.kill();
    }

    /// The underlying polling view.
    pub fn positions(&self) -> &PollingView<ActiveFleet> {
        &self.inner.view
    }

    /// Current fleet state.
    pub fn snapshot(&self) -> PollState<FleetSnapshot> {
        self.inner.view.snapshot()
    }

    /// Currently selected entity.
    pub fn selected(&self) -> Option<EntityId> {
        self.lock().entity.clone()
    }

    /// Select `entity` and fetch its trail.
    pub async fn select(&self, entity: EntityId) -> FetchOutcome {
        if !self.inner.liveness.is_alive() {
            return FetchOutcome::Skipped;
        }
        let ticket = {
            let mut selection = self.lock();
            selection.latest_ticket += 1;
            selection.entity = Some(entity.clone());
            self.inner.trail.update(Record::set_loading);
            selection.latest_ticket
        };
        let path = format!("/tracking/{}", entity.path_segment());
        let request = ApiRequest::get(AuthDomain::Admin, path)
            .with_query(vec![("limit".to_owned(), self.inner.history_limit.to_string())]);
        let result = self.inner.client.request(request).await;
        self.commit(ticket, entity, result.map_err(DataError::from))
    }

    /// Clear the selection; a trail fetch still in flight is discarded.
    pub fn clear_selection(&self) {
        let mut selection = self.lock();
        selection.latest_ticket += 1;
        selection.entity = None;
        self.inner.trail.update(|trail| *trail = Record::default());
    }

    /// Current trail state.
    pub fn trail(&self) -> Record<Trail> {
        self.inner.trail.snapshot()
    }

    /// Receiver for every committed trail state.
    pub fn subscribe_trail(&self) -> watch::Receiver<Record<Trail>> {
        self.inner.trail.subscribe()
    }

    fn commit(
        &self,
        ticket: u64,
        entity: EntityId,
        result: Result<Value, DataError>,
    ) -> FetchOutcome {
        let selection = self.lock();
        if !self.inner.liveness.is_alive()
            || selection.latest_ticket != ticket
            || selection.entity.as_ref() != Some(&entity)
        {
            debug!(%entity, ticket, "dropping superseded trail");
            return FetchOutcome::Discarded;
        }
        match result {
            Ok(raw) => {
                let mut samples = decode_list::<LocationSample>(&raw, ROW_KEY).items;
                samples.sort_by(|left, right| left.recorded_at.cmp(&right.recorded_at));
                self.inner
                    .trail
                    .update(|trail| trail.set_succeeded(Trail { entity, samples }));
                FetchOutcome::Committed
            }
            Err(error) => {
                debug!(%entity, %error, "trail fetch failed");
                self.inner
                    .trail
                    .update(|trail| trail.set_failed(error.to_string()));
                FetchOutcome::Failed
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Selection> {
        self.inner
            .selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::HttpMethod;
    use crate::test_support::StubRemoteClient;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    const INTERVAL: Duration = Duration::from_secs(30);

    fn tracking(client: &Arc<StubRemoteClient>) -> FleetTracking {
        FleetTracking::new(Arc::clone(client) as Arc<dyn RemoteDataClient>, INTERVAL, 25)
    }

    #[rstest]
    fn array_keeps_latest_sample_per_entity() {
        let snapshot = decode_active(json!([
            { "driverId": 7, "id": 900, "lat": 6.50, "lng": 3.30, "timestamp": "2026-03-10T10:00:00Z" },
            { "driverId": 7, "id": 901, "lat": 6.51, "lng": 3.31, "timestamp": "2026-03-10T10:00:30Z" },
            { "driverId": 7, "id": 899, "lat": 6.49, "lng": 3.29, "timestamp": "2026-03-10T09:59:30Z" },
            { "driverId": 8, "lat": 6.60, "lng": 3.40 }
        ]));

        assert_eq!(snapshot.len(), 2);
        let seven = snapshot.position(&EntityId::from(7)).expect("tracked");
        assert!((seven.latitude - 6.51).abs() < f64::EPSILON);
    }

    #[rstest]
    fn object_keyed_by_entity_id_is_accepted() {
        let snapshot = decode_active(json!({
            "7": { "latitude": 6.5, "longitude": 3.3 },
            "bus-2": { "lat": 6.6, "lng": 3.4 }
        }));

        assert!(snapshot.position(&EntityId::from(7)).is_some());
        assert!(snapshot.position(&EntityId::from("bus-2")).is_some());
    }

    #[rstest]
    #[case(json!({ "data": [{ "driverId": 1, "lat": 1.0, "lng": 1.0 }] }), 1)]
    #[case(json!({ "locations": [{ "entityId": "a", "lat": 1.0, "lng": 1.0 }] }), 1)]
    #[case(json!([{ "lat": 1.0, "lng": 1.0 }]), 0)]
    #[case(json!("offline"), 0)]
    fn envelopes_and_anonymous_rows(#[case] raw: Value, #[case] expected: usize) {
        assert_eq!(decode_active(raw).len(), expected);
    }

    #[rstest]
    fn stale_lists_silent_entities() {
        let snapshot = decode_active(json!([
            { "driverId": 1, "lat": 1.0, "lng": 1.0, "timestamp": "2026-03-10T10:00:00Z" },
            { "driverId": 2, "lat": 1.0, "lng": 1.0, "timestamp": "2026-03-10T10:04:30Z" },
            { "driverId": 3, "lat": 1.0, "lng": 1.0 }
        ]));
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 10, 5, 0).unwrap();

        let stale = snapshot.stale(now, chrono::Duration::minutes(2));

        assert_eq!(stale, [EntityId::from(1), EntityId::from(3)]);
    }

    #[rstest]
    #[tokio::test]
    async fn later_selection_wins() {
        let client = StubRemoteClient::new();
        let first = client.defer(HttpMethod::Get, "/tracking/1");
        let second = client.defer(HttpMethod::Get, "/tracking/2");
        let screen = tracking(&client);

        let slow = tokio::spawn({
            let screen = screen.clone();
            async move { screen.select(EntityId::from(1)).await }
        });
        client.wait_for_requests(1).await;
        let fast = tokio::spawn({
            let screen = screen.clone();
            async move { screen.select(EntityId::from(2)).await }
        });
        client.wait_for_requests(2).await;
        second.resolve(Ok(json!([
            { "lat": 2.0, "lng": 2.0, "timestamp": "2026-03-10T10:01:00Z" },
            { "lat": 2.1, "lng": 2.1, "timestamp": "2026-03-10T10:00:00Z" }
        ])));
        first.resolve(Ok(json!([{ "lat": 1.0, "lng": 1.0 }])));

        assert_eq!(fast.await.expect("join"), FetchOutcome::Committed);
        assert_eq!(slow.await.expect("join"), FetchOutcome::Discarded);
        let trail = screen.trail().value.expect("trail");
        assert_eq!(trail.entity, EntityId::from(2));
        assert!((trail.samples[0].latitude - 2.1).abs() < f64::EPSILON);
        let sent = client.requests_to(HttpMethod::Get, "/tracking/2");
        assert_eq!(sent[0].query_value("limit"), Some("25"));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn selection_does_not_disturb_polling() {
        let client = StubRemoteClient::new();
        client.always(HttpMethod::Get, ACTIVE_PATH, Ok(json!([])));
        client.always(HttpMethod::Get, "/tracking/4", Ok(json!([])));
        let screen = tracking(&client);
        screen.mount();
        client.wait_for_requests(1).await;

        screen.select(EntityId::from(4)).await;
        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        client.wait_for_requests(3).await;

        assert_eq!(client.requests_to(HttpMethod::Get, ACTIVE_PATH).len(), 2);
        assert_eq!(screen.positions().skipped_ticks(), 0);
        screen.unmount();
    }

    #[rstest]
    #[tokio::test]
    async fn cleared_selection_discards_pending_trail() {
        let client = StubRemoteClient::new();
        let pending = client.defer(HttpMethod::Get, "/tracking/5");
        let screen = tracking(&client);
        let select = tokio::spawn({
            let screen = screen.clone();
            async move { screen.select(EntityId::from(5)).await }
        });
        client.wait_for_requests(1).await;

        screen.clear_selection();
        pending.resolve(Ok(json!([{ "lat": 1.0, "lng": 1.0 }])));

        assert_eq!(select.await.expect("join"), FetchOutcome::Discarded);
        assert!(screen.selected().is_none());
        assert!(screen.trail().value.is_none());
    }
}
