//! Admin analytics dashboard.
//!
//! Stats, summary, recent activity and heatmap are fetched concurrently and
//! settled independently: one failing panel never hides the others.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info};

use super::heatmap::{HEATMAP_PATH, HeatmapData};
use crate::domain::ports::ApiRequest;
use crate::domain::record::decode_document;
use crate::domain::{
    AuthDomain, ControllerPorts, DataError, DateFilter, DateParams, EntityId, FetchOutcome,
    Liveness, PanelState, RequestKey, Slice, decode_list,
};

/// Headline counters endpoint.
pub const STATS_PATH: &str = "/admin/analytics/stats";
/// Period summary endpoint.
pub const SUMMARY_PATH: &str = "/admin/analytics/summary";
/// Recent activity feed endpoint.
pub const ACTIVITY_PATH: &str = "/admin/analytics/recent-activity";

/// Headline counters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FleetStats {
    /// Registered riders.
    pub total_users: u64,
    /// Registered drivers.
    pub total_drivers: u64,
    /// Drivers currently online.
    pub online_drivers: u64,
    /// Trips in progress.
    pub active_trips: u64,
}

/// Totals for the selected period.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TripSummary {
    /// Trips completed.
    pub completed_trips: u64,
    /// Trips cancelled by either side.
    pub cancelled_trips: u64,
    /// Gross fares.
    #[serde(alias = "totalRevenue")]
    pub revenue: f64,
    /// Mean fare of completed trips.
    pub average_fare: Option<f64>,
}

impl TripSummary {
    /// Cancelled share of all finished trips, if any finished.
    pub fn cancellation_rate(&self) -> Option<f64> {
        let finished = self.completed_trips + self.cancelled_trips;
        (finished > 0).then(|| self.cancelled_trips as f64 / finished as f64)
    }
}

/// One entry of the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// Backend id.
    #[serde(default)]
    pub id: Option<EntityId>,
    /// Event kind, e.g. `TRIP_COMPLETED`.
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    /// Human-readable description.
    #[serde(alias = "message")]
    pub description: String,
    /// Event time.
    #[serde(default, alias = "createdAt", alias = "timestamp")]
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Settled panels of one dashboard load.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardPanels {
    /// Headline counters.
    pub stats: PanelState<FleetStats>,
    /// Period summary.
    pub summary: PanelState<TripSummary>,
    /// Activity feed, newest first as sent.
    pub activity: PanelState<Vec<ActivityEntry>>,
    /// Demand heatmap.
    pub heatmap: PanelState<HeatmapData>,
}

impl DashboardPanels {
    /// Names of the panels that failed.
    pub fn failed_panels(&self) -> Vec<&'static str> {
        [
            ("stats", self.stats.is_ready()),
            ("summary", self.summary.is_ready()),
            ("activity", self.activity.is_ready()),
            ("heatmap", self.heatmap.is_ready()),
        ]
        .into_iter()
        .filter_map(|(name, ready)| (!ready).then_some(name))
        .collect()
    }
}

/// Published dashboard state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Panels from the latest committed load. Failed panels keep the value
    /// of the last load that filled them.
    pub panels: Option<Arc<DashboardPanels>>,
    /// A load is in flight.
    pub is_loading: bool,
}

struct Loads {
    latest_ticket: u64,
    date: DateFilter,
}

/// Dashboard that loads all panels together.
#[derive(Clone)]
pub struct AnalyticsDashboard {
    ports: ControllerPorts,
    slice: Arc<Slice<DashboardState>>,
    loads: Arc<Mutex<Loads>>,
    liveness: Liveness,
}

impl AnalyticsDashboard {
    /// Build an unloaded dashboard.
    pub fn new(ports: ControllerPorts) -> Self {
        Self {
            ports,
            slice: Arc::new(Slice::default()),
            loads: Arc::new(Mutex::new(Loads {
                latest_ticket: 0,
                date: DateFilter::Any,
            })),
            liveness: Liveness::default(),
        }
    }

    /// Load every panel for `date` once all four fetches settle. A newer
    /// load supersedes this one.
    pub async fn load(&self, date: DateFilter) -> FetchOutcome {
        if !self.liveness.is_alive() {
            return FetchOutcome::Skipped;
        }
        let ticket = {
            let mut loads = self.lock();
            loads.latest_ticket += 1;
            loads.date = date;
            self.slice.update(|state| state.is_loading = true);
            loads.latest_ticket
        };
        let query = RequestKey {
            date,
            ..RequestKey::default()
        }
        .to_query(self.ports.clock.as_ref(), DateParams::default())
        .to_pairs();

        let (stats, summary, activity, heatmap) = tokio::join!(
            self.fetch_document::<FleetStats>(STATS_PATH, &query),
            self.fetch_document::<TripSummary>(SUMMARY_PATH, &query),
            self.fetch_activity(&query),
            self.fetch_document::<HeatmapData>(HEATMAP_PATH, &query),
        );
        let previous = self.slice.snapshot().panels;
        let previous = previous.as_deref();
        let panels = DashboardPanels {
            stats: PanelState::settle_over("stats", stats, previous.map(|p| &p.stats)),
            summary: PanelState::settle_over("summary", summary, previous.map(|p| &p.summary)),
            activity: PanelState::settle_over("activity", activity, previous.map(|p| &p.activity)),
            heatmap: PanelState::settle_over("heatmap", heatmap, previous.map(|p| &p.heatmap)),
        };

        let loads = self.lock();
        if !self.liveness.is_alive() || loads.latest_ticket != ticket {
            debug!(ticket, "dropping superseded dashboard load");
            return FetchOutcome::Discarded;
        }
        let failed = panels.failed_panels();
        info!(?failed, "dashboard loaded");
        self.slice.update(|state| {
            state.panels = Some(Arc::new(panels));
            state.is_loading = false;
        });
        if failed.is_empty() {
            FetchOutcome::Committed
        } else {
            FetchOutcome::Failed
        }
    }

    /// Reload with the last requested date filter.
    pub async fn refresh(&self) -> FetchOutcome {
        let date = self.lock().date;
        self.load(date).await
    }

    /// Drop any load still in flight. Final.
    pub fn unmount(&self) {
        self.liveness.kill();
    }

    /// Current state.
    pub fn snapshot(&self) -> DashboardState {
        self.slice.snapshot()
    }

    /// Receiver for every committed state.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.slice.subscribe()
    }

    async fn fetch_document<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, DataError> {
        let request = ApiRequest::get(AuthDomain::Admin, path).with_query(query.to_vec());
        let raw = self.ports.client.request(request).await?;
        decode_document(raw)
    }

    async fn fetch_activity(
        &self,
        query: &[(String, String)],
    ) -> Result<Vec<ActivityEntry>, DataError> {
        let request = ApiRequest::get(AuthDomain::Admin, ACTIVITY_PATH).with_query(query.to_vec());
        let raw = self.ports.client.request(request).await?;
        Ok(decode_list::<ActivityEntry>(&raw, "activities").items)
    }

    fn lock(&self) -> MutexGuard<'_, Loads> {
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{HttpMethod, RemoteError};
    use crate::test_support::{RecordingNotifier, StubRemoteClient, stub_ports};
    use rstest::rstest;
    use serde_json::json;

    fn dashboard(client: &Arc<StubRemoteClient>) -> AnalyticsDashboard {
        AnalyticsDashboard::new(stub_ports(client, &RecordingNotifier::new()))
    }

    #[rstest]
    #[tokio::test]
    async fn one_failing_panel_leaves_the_others_ready() {
        let client = StubRemoteClient::new();
        client.reply(HttpMethod::Get, STATS_PATH, Ok(json!({ "totalUsers": 120, "activeTrips": 4 })));
        client.reply(
            HttpMethod::Get,
            SUMMARY_PATH,
            Err(RemoteError::Network {
                message: "timed out".into(),
            }),
        );
        client.reply(
            HttpMethod::Get,
            ACTIVITY_PATH,
            Ok(json!({ "activities": [{ "type": "TRIP_COMPLETED", "message": "Trip 9 completed" }] })),
        );
        client.reply(HttpMethod::Get, HEATMAP_PATH, Ok(json!([])));
        let dashboard = dashboard(&client);

        assert_eq!(dashboard.load(DateFilter::Any).await, FetchOutcome::Failed);

        let state = dashboard.snapshot();
        let panels = state.panels.expect("settled");
        assert_eq!(panels.stats.ready().map(|stats| stats.total_users), Some(120));
        assert_eq!(panels.failed_panels(), ["summary"]);
        assert_eq!(
            panels.activity.ready().map(|feed| feed[0].description.as_str()),
            Some("Trip 9 completed")
        );
        assert!(!state.is_loading);
    }

    #[rstest]
    #[tokio::test]
    async fn every_panel_shares_the_resolved_range() {
        let client = StubRemoteClient::new();
        for path in [STATS_PATH, SUMMARY_PATH, ACTIVITY_PATH, HEATMAP_PATH] {
            client.always(HttpMethod::Get, path, Ok(json!({ "data": [] })));
        }
        let dashboard = dashboard(&client);

        dashboard.load(DateFilter::Last7Days).await;

        let sent = client.requests();
        assert_eq!(sent.len(), 4);
        assert!(sent.iter().all(|request| {
            request.query_value("startDate") == Some("2026-03-04")
                && request.query_value("endDate") == Some("2026-03-10")
        }));
    }

    #[rstest]
    #[tokio::test]
    async fn unmounted_dashboard_discards_the_load() {
        let client = StubRemoteClient::new();
        let pending = client.defer(HttpMethod::Get, STATS_PATH);
        for path in [SUMMARY_PATH, ACTIVITY_PATH, HEATMAP_PATH] {
            client.always(HttpMethod::Get, path, Ok(json!([])));
        }
        let dashboard = dashboard(&client);
        let load = tokio::spawn({
            let dashboard = dashboard.clone();
            async move { dashboard.load(DateFilter::Today).await }
        });
        client.wait_for_requests(4).await;

        dashboard.unmount();
        pending.resolve(Ok(json!({})));

        assert_eq!(load.await.expect("join"), FetchOutcome::Discarded);
        assert!(dashboard.snapshot().panels.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn failed_refresh_keeps_the_last_good_panel() {
        let client = StubRemoteClient::new();
        client.reply(HttpMethod::Get, STATS_PATH, Ok(json!({ "totalUsers": 120 })));
        client.reply(
            HttpMethod::Get,
            STATS_PATH,
            Err(RemoteError::Network {
                message: "timed out".into(),
            }),
        );
        client.always(HttpMethod::Get, SUMMARY_PATH, Ok(json!({ "completedTrips": 8 })));
        client.always(HttpMethod::Get, ACTIVITY_PATH, Ok(json!([])));
        client.always(HttpMethod::Get, HEATMAP_PATH, Ok(json!([])));
        let dashboard = dashboard(&client);

        assert_eq!(dashboard.load(DateFilter::Any).await, FetchOutcome::Committed);
        assert_eq!(dashboard.refresh().await, FetchOutcome::Failed);

        let panels = dashboard.snapshot().panels.expect("settled");
        assert_eq!(panels.failed_panels(), ["stats"]);
        assert!(matches!(panels.stats.error(), Some(DataError::Network { .. })));
        assert_eq!(panels.stats.latest().map(|stats| stats.total_users), Some(120));
    }

    #[rstest]
    fn cancellation_rate_needs_finished_trips() {
        let summary = TripSummary {
            completed_trips: 3,
            cancelled_trips: 1,
            ..TripSummary::default()
        };
        assert_eq!(summary.cancellation_rate(), Some(0.25));
        assert_eq!(TripSummary::default().cancellation_rate(), None);
    }
}
