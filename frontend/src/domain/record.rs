//! Controllers for single-record endpoints.
//!
//! Business settings, trip fares and heatmap queries return one document
//! rather than a list. The same rules apply as for list screens: the latest
//! query wins, failures keep the stale value, and writes are followed by a
//! refetch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::controller::{ControllerPorts, FetchOutcome, Phase};
use crate::domain::ports::{ApiRequest, RemoteError};
use crate::domain::{
    AuthDomain, DataError, DateFilter, DateParams, FilterSet, Liveness, Record, RecordSlice,
    RequestKey,
};

/// Screen-specific knowledge a [`RecordController`] needs.
pub trait RecordScreen: Send + Sync + 'static {
    /// Decoded document.
    type Value: DeserializeOwned + Clone + Send + Sync + 'static;

    /// Label used in toasts.
    fn label(&self) -> &'static str;

    /// Credential scope.
    fn domain(&self) -> AuthDomain {
        AuthDomain::Admin
    }

    /// Endpoint path for reads and writes.
    fn path(&self) -> String;

    /// Parameter names for a resolved date filter.
    fn date_params(&self) -> DateParams {
        DateParams::default()
    }
}

struct RecordState {
    key: RequestKey,
    phase: Phase,
    latest_ticket: u64,
    mounted: bool,
    mutations_blocked: bool,
}

struct Inner<S: RecordScreen> {
    screen: S,
    ports: ControllerPorts,
    slice: RecordSlice<S::Value>,
    state: Mutex<RecordState>,
    liveness: Liveness,
}

/// Last-request-wins controller for one record endpoint.
pub struct RecordController<S: RecordScreen> {
    inner: Arc<Inner<S>>,
}

impl<S: RecordScreen> Clone for RecordController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RecordScreen> RecordController<S> {
    /// Build an unmounted controller.
    pub fn new(screen: S, ports: ControllerPorts) -> Self {
        Self {
            inner: Arc::new(Inner {
                screen,
                ports,
                slice: RecordSlice::default(),
                state: Mutex::new(RecordState {
                    key: RequestKey::initial(None),
                    phase: Phase::Idle,
                    latest_ticket: 0,
                    mounted: false,
                    mutations_blocked: false,
                }),
                liveness: Liveness::default(),
            }),
        }
    }

    /// Screen definition.
    pub fn screen(&self) -> &S {
        &self.inner.screen
    }

    /// Mount and fetch with the current query.
    pub async fn load(&self) -> FetchOutcome {
        {
            let mut state = self.inner.lock();
            if state.mounted || !self.inner.liveness.is_alive() {
                return FetchOutcome::Skipped;
            }
            state.mounted = true;
        }
        self.fetch().await
    }

    /// Replace the query and fetch, even when it equals the current one.
    /// This is the explicit submit of a query form.
    pub async fn submit(&self, filters: FilterSet, date: DateFilter) -> FetchOutcome {
        {
            let mut state = self.inner.lock();
            state.key.filters = filters;
            state.key.date = date;
        }
        self.fetch().await
    }

    /// Refetch unconditionally.
    pub async fn refresh(&self) -> FetchOutcome {
        self.fetch().await
    }

    /// `PUT` the whole document, then refetch.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MutationBlocked`] while an earlier failure is
    /// unacknowledged, otherwise the backend failure.
    pub async fn update(&self, body: Value) -> Result<Value, DataError> {
        if self.inner.lock().mutations_blocked {
            return Err(DataError::MutationBlocked);
        }
        let screen = &self.inner.screen;
        let request = ApiRequest::put(screen.domain(), screen.path(), body);
        let result = self.inner.ports.client.request(request).await;
        if !self.inner.liveness.is_alive() {
            return result.map_err(DataError::from);
        }
        match result {
            Ok(body) => {
                info!(screen = screen.label(), "record saved");
                self.inner
                    .ports
                    .notifier
                    .success(&format!("{} saved", screen.label()));
                self.fetch().await;
                Ok(body)
            }
            Err(error) => {
                let error = DataError::from(error);
                if !error.is_auth_expired() {
                    self.inner.lock().mutations_blocked = true;
                    self.inner.ports.notifier.error(&error.user_message());
                }
                Err(error)
            }
        }
    }

    /// Clear the mutation gate and the error banner.
    pub fn acknowledge_error(&self) {
        self.inner.lock().mutations_blocked = false;
        self.inner.slice.update(|record| record.error = None);
    }

    /// Stop committing results.
    pub fn unmount(&self) {
        if self.inner.liveness.kill() {
            debug!(screen = self.inner.screen.label(), "record controller unmounted");
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    /// Current query.
    pub fn key(&self) -> RequestKey {
        self.inner.lock().key.clone()
    }

    /// Current slice state.
    pub fn snapshot(&self) -> Record<S::Value> {
        self.inner.slice.snapshot()
    }

    /// Receiver for every committed state.
    pub fn subscribe(&self) -> watch::Receiver<Record<S::Value>> {
        self.inner.slice.subscribe()
    }

    async fn fetch(&self) -> FetchOutcome {
        let (ticket, key) = {
            let mut state = self.inner.lock();
            if !state.mounted || !self.inner.liveness.is_alive() {
                return FetchOutcome::Skipped;
            }
            state.latest_ticket += 1;
            state.phase = Phase::Fetching;
            self.inner.slice.update(Record::set_loading);
            (state.latest_ticket, state.key.clone())
        };
        let screen = &self.inner.screen;
        let query = key.to_query(self.inner.ports.clock.as_ref(), screen.date_params());
        let request = ApiRequest::get(screen.domain(), screen.path()).with_query(query.to_pairs());
        let result = self.inner.ports.client.request(request).await;
        self.commit(ticket, &key, result)
    }

    fn commit(
        &self,
        ticket: u64,
        key: &RequestKey,
        result: Result<Value, RemoteError>,
    ) -> FetchOutcome {
        let label = self.inner.screen.label();
        let mut state = self.inner.lock();
        if !self.inner.liveness.is_alive()
            || state.latest_ticket != ticket
            || state.key != *key
        {
            debug!(screen = label, ticket, "dropping stale record");
            return FetchOutcome::Discarded;
        }
        let decoded = result
            .map_err(DataError::from)
            .and_then(decode_document::<S::Value>);
        match decoded {
            Ok(value) => {
                state.phase = Phase::Succeeded;
                self.inner.slice.update(|record| record.set_succeeded(value));
                FetchOutcome::Committed
            }
            Err(error) => {
                debug!(screen = label, %error, "record fetch failed");
                state.phase = Phase::Failed;
                self.inner
                    .slice
                    .update(|record| record.set_failed(error.to_string()));
                FetchOutcome::Failed
            }
        }
    }
}

impl<S: RecordScreen> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decode a document that may be wrapped in a `data` field.
pub(crate) fn decode_document<T: DeserializeOwned>(raw: Value) -> Result<T, DataError> {
    let wrapped = raw.get("data").cloned();
    match serde_json::from_value::<T>(raw) {
        Ok(value) => Ok(value),
        Err(error) => wrapped
            .and_then(|inner| serde_json::from_value::<T>(inner).ok())
            .ok_or_else(|| DataError::Network {
                message: format!("unexpected document: {error}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::HttpMethod;
    use crate::test_support::{Notice, RecordingNotifier, StubRemoteClient, stub_ports};
    use rstest::rstest;
    use serde::Deserialize;
    use serde_json::json;

    const PATH: &str = "/admin/business-settings";

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Settings {
        commission_rate: f64,
    }

    struct SettingsScreen;

    impl RecordScreen for SettingsScreen {
        type Value = Settings;

        fn label(&self) -> &'static str {
            "Business settings"
        }

        fn path(&self) -> String {
            PATH.to_owned()
        }
    }

    fn controller(
        client: &Arc<StubRemoteClient>,
        notifier: &Arc<RecordingNotifier>,
    ) -> RecordController<SettingsScreen> {
        RecordController::new(SettingsScreen, stub_ports(client, notifier))
    }

    #[rstest]
    #[case(json!({ "commissionRate": 0.15 }))]
    #[case(json!({ "data": { "commissionRate": 0.15 } }))]
    #[tokio::test]
    async fn load_accepts_bare_and_wrapped_documents(#[case] body: Value) {
        let client = StubRemoteClient::new();
        client.reply(HttpMethod::Get, PATH, Ok(body));
        let records = controller(&client, &RecordingNotifier::new());

        assert_eq!(records.load().await, FetchOutcome::Committed);
        let value = records.snapshot().value.expect("loaded");
        assert!((value.commission_rate - 0.15).abs() < f64::EPSILON);
    }

    #[rstest]
    #[tokio::test]
    async fn save_notifies_and_refetches() {
        let client = StubRemoteClient::new();
        client.reply(HttpMethod::Get, PATH, Ok(json!({ "commissionRate": 0.1 })));
        client.reply(HttpMethod::Put, PATH, Ok(json!({ "commissionRate": 0.2 })));
        client.reply(HttpMethod::Get, PATH, Ok(json!({ "commissionRate": 0.2 })));
        let notifier = RecordingNotifier::new();
        let records = controller(&client, &notifier);
        records.load().await;

        records
            .update(json!({ "commissionRate": 0.2 }))
            .await
            .expect("save succeeds");

        assert_eq!(client.requests_to(HttpMethod::Get, PATH).len(), 2);
        assert_eq!(
            notifier.notices(),
            [Notice::Success("Business settings saved".into())]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn failed_load_keeps_previous_value() {
        let client = StubRemoteClient::new();
        client.reply(HttpMethod::Get, PATH, Ok(json!({ "commissionRate": 0.1 })));
        client.reply(HttpMethod::Get, PATH, Ok(json!("maintenance")));
        let records = controller(&client, &RecordingNotifier::new());
        records.load().await;

        assert_eq!(records.refresh().await, FetchOutcome::Failed);
        let snapshot = records.snapshot();
        assert!(snapshot.value.is_some());
        assert!(snapshot.error.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn later_submit_wins() {
        let client = StubRemoteClient::new();
        client.reply(HttpMethod::Get, PATH, Ok(json!({ "commissionRate": 0.0 })));
        let records = controller(&client, &RecordingNotifier::new());
        records.load().await;
        let slow = client.defer(HttpMethod::Get, PATH);
        let fast = client.defer(HttpMethod::Get, PATH);

        let first = tokio::spawn({
            let records = records.clone();
            async move {
                records
                    .submit(FilterSet::default().with("zone", "north"), DateFilter::Any)
                    .await
            }
        });
        client.wait_for_requests(2).await;
        let second = tokio::spawn({
            let records = records.clone();
            async move {
                records
                    .submit(FilterSet::default().with("zone", "south"), DateFilter::Any)
                    .await
            }
        });
        client.wait_for_requests(3).await;
        fast.resolve(Ok(json!({ "commissionRate": 0.5 })));
        slow.resolve(Ok(json!({ "commissionRate": 0.9 })));

        assert_eq!(second.await.expect("join"), FetchOutcome::Committed);
        assert_eq!(first.await.expect("join"), FetchOutcome::Discarded);
        let value = records.snapshot().value.expect("loaded");
        assert!((value.commission_rate - 0.5).abs() < f64::EPSILON);
    }
}
