//! Fetch-on-change orchestration for list screens.
//!
//! A [`PageController`] owns one [`DomainSlice`] and moves through
//! `Idle -> Fetching -> {Succeeded, Failed}`. It refetches whenever the
//! [`RequestKey`] changes by value, and commits a completed fetch only when
//! the fetch is the latest one issued and its key still equals the current
//! key. Mutations are followed by a full refetch; nothing is patched locally.

mod mutation;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mockable::Clock;
use pagination::{PageRequest, PageRequestError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::listing::decode_list;
use crate::domain::ports::{ApiRequest, Notifier, RemoteDataClient, RemoteError};
use crate::domain::{
    AuthDomain, Collection, DataError, DateFilter, DateParams, DomainSlice, EntityId, FilterSet,
    Liveness, RequestKey,
};

/// Screen-specific knowledge a [`PageController`] needs.
pub trait ListScreen: Send + Sync + 'static {
    /// Entity row as decoded from the backend.
    type Row: DeserializeOwned + Clone + Send + Sync + 'static;
    /// Projected row handed to presentation.
    type View;

    /// Singular label used in toasts, for example `"Coupon"`.
    fn label(&self) -> &'static str;

    /// Credential scope of the screen's requests.
    fn domain(&self) -> AuthDomain {
        AuthDomain::Admin
    }

    /// Path of the collection endpoint.
    fn collection_path(&self) -> String;

    /// Row key used by keyed envelopes, for example `"coupons"`.
    fn plural(&self) -> &'static str;

    /// Whether the endpoint takes `page` and `size`.
    fn paginated(&self) -> bool {
        true
    }

    /// Parameter names for a resolved date filter.
    fn date_params(&self) -> DateParams {
        DateParams::default()
    }

    /// Path of one member, used by update and delete.
    fn member_path(&self, id: &EntityId) -> String {
        format!("{}/{}", self.collection_path(), id.path_segment())
    }

    /// Pure projection from an entity row to a view row.
    fn project(&self, row: &Self::Row) -> Self::View;
}

/// Shared dependencies of every controller.
#[derive(Clone)]
pub struct ControllerPorts {
    /// Backend access.
    pub client: Arc<dyn RemoteDataClient>,
    /// Toast sink for mutation outcomes.
    pub notifier: Arc<dyn Notifier>,
    /// Time source for date presets.
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl ControllerPorts {
    /// Bundle the three ports.
    pub fn new(
        client: Arc<dyn RemoteDataClient>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            client,
            notifier,
            clock,
        }
    }
}

/// Controller state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not mounted yet.
    Idle,
    /// The latest fetch has not completed.
    Fetching,
    /// The latest fetch committed rows.
    Succeeded,
    /// The latest fetch failed; stale rows stay visible.
    Failed,
}

/// What happened to a fetch triggered by a controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result was written to the slice.
    Committed,
    /// The failure was written to the slice.
    Failed,
    /// A newer fetch superseded this one, or the controller was unmounted.
    Discarded,
    /// No fetch was needed: the key did not change or the controller is not
    /// mounted.
    Skipped,
}

struct ControlState {
    key: RequestKey,
    phase: Phase,
    latest_ticket: u64,
    mounted: bool,
    mutations_blocked: bool,
}

struct Inner<S: ListScreen> {
    screen: S,
    ports: ControllerPorts,
    slice: DomainSlice<S::Row>,
    state: Mutex<ControlState>,
    liveness: Liveness,
}

/// Last-request-wins controller for one list screen.
///
/// Cloning yields another handle to the same controller. Unmounting is
/// final; build a new controller to show the screen again.
pub struct PageController<S: ListScreen> {
    inner: Arc<Inner<S>>,
}

impl<S: ListScreen> Clone for PageController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ListScreen> PageController<S> {
    /// Build an unmounted controller. `page` is ignored for screens that are
    /// not paginated.
    pub fn new(screen: S, ports: ControllerPorts, page: PageRequest) -> Self {
        let page = screen.paginated().then_some(page.first());
        Self {
            inner: Arc::new(Inner {
                screen,
                ports,
                slice: DomainSlice::default(),
                state: Mutex::new(ControlState {
                    key: RequestKey::initial(page),
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

    /// Mount the screen and fetch the current key.
    pub async fn mount(&self) -> FetchOutcome {
        {
            let mut state = self.inner.lock();
            if state.mounted || !self.inner.liveness.is_alive() {
                return FetchOutcome::Skipped;
            }
            state.mounted = true;
        }
        self.fetch().await
    }

    /// Stop committing results. In-flight fetches and mutations complete but
    /// their results are dropped.
    pub fn unmount(&self) {
        if self.inner.liveness.kill() {
            debug!(screen = self.inner.screen.label(), "controller unmounted");
        }
    }

    /// Set one filter. A changed value resets the page to 0 and refetches.
    pub async fn set_filter(&self, name: &str, value: &str) -> FetchOutcome {
        self.change_key(|key| {
            let changed = key.filters.set(name, value);
            if changed {
                key.rewind();
            }
            changed
        })
        .await
    }

    /// Remove one filter, resetting the page if it was set.
    pub async fn clear_filter(&self, name: &str) -> FetchOutcome {
        self.change_key(|key| {
            let changed = key.filters.remove(name);
            if changed {
                key.rewind();
            }
            changed
        })
        .await
    }

    /// Replace every filter at once, as a submitted filter form does.
    pub async fn set_filters(&self, filters: FilterSet) -> FetchOutcome {
        self.change_key(|key| {
            if key.filters == filters {
                return false;
            }
            key.filters = filters;
            key.rewind();
            true
        })
        .await
    }

    /// Change the date preset, resetting the page.
    pub async fn set_date_filter(&self, date: DateFilter) -> FetchOutcome {
        self.change_key(|key| {
            if key.date == date {
                return false;
            }
            key.date = date;
            key.rewind();
            true
        })
        .await
    }

    /// Move to 0-based `page`. Ignored for screens that are not paginated.
    pub async fn set_page(&self, page: u32) -> Result<FetchOutcome, PageRequestError> {
        let current = self.inner.lock().key.page;
        let Some(current) = current else {
            return Ok(FetchOutcome::Skipped);
        };
        let next = current.with_page(page)?;
        Ok(self.change_key(|key| replace_page(key, next)).await)
    }

    /// Change the page size. The page resets to 0.
    pub async fn set_page_size(&self, size: u32) -> Result<FetchOutcome, PageRequestError> {
        if self.inner.lock().key.page.is_none() {
            return Ok(FetchOutcome::Skipped);
        }
        let next = PageRequest::first_of(size)?;
        Ok(self.change_key(|key| replace_page(key, next)).await)
    }

    /// Refetch the current key unconditionally.
    pub async fn refresh(&self) -> FetchOutcome {
        self.fetch().await
    }

    /// Clear the mutation gate and the read error banner.
    pub fn acknowledge_error(&self) {
        self.inner.lock().mutations_blocked = false;
        self.inner.slice.update(Collection::dismiss_error);
    }

    /// Current request key.
    pub fn key(&self) -> RequestKey {
        self.inner.lock().key.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    /// Whether writes are blocked by an unacknowledged failure.
    pub fn mutations_blocked(&self) -> bool {
        self.inner.lock().mutations_blocked
    }

    /// Current slice state.
    pub fn snapshot(&self) -> Collection<S::Row> {
        self.inner.slice.snapshot()
    }

    /// Receiver for every committed slice state.
    pub fn subscribe(&self) -> watch::Receiver<Collection<S::Row>> {
        self.inner.slice.subscribe()
    }

    /// Current rows projected for presentation.
    pub fn view_rows(&self) -> Vec<S::View> {
        let snapshot = self.snapshot();
        snapshot
            .items
            .iter()
            .map(|row| self.inner.screen.project(row))
            .collect()
    }

    async fn change_key(&self, change: impl FnOnce(&mut RequestKey) -> bool) -> FetchOutcome {
        let changed = change(&mut self.inner.lock().key);
        if !changed {
            return FetchOutcome::Skipped;
        }
        self.fetch().await
    }

    async fn fetch(&self) -> FetchOutcome {
        let (ticket, key) = {
            let mut state = self.inner.lock();
            if !state.mounted || !self.inner.liveness.is_alive() {
                return FetchOutcome::Skipped;
            }
            state.latest_ticket += 1;
            state.phase = Phase::Fetching;
            self.inner.slice.update(Collection::set_loading);
            (state.latest_ticket, state.key.clone())
        };

        let request = self.list_request(&key);
        let result = self.inner.ports.client.request(request).await;
        self.commit(ticket, &key, result)
    }

    fn list_request(&self, key: &RequestKey) -> ApiRequest {
        let screen = &self.inner.screen;
        let query = key.to_query(self.inner.ports.clock.as_ref(), screen.date_params());
        ApiRequest::get(screen.domain(), screen.collection_path()).with_query(query.to_pairs())
    }

    fn commit(
        &self,
        ticket: u64,
        key: &RequestKey,
        result: Result<Value, RemoteError>,
    ) -> FetchOutcome {
        let screen = &self.inner.screen;
        let mut state = self.inner.lock();
        if !self.inner.liveness.is_alive() {
            debug!(screen = screen.label(), ticket, "dropping result after unmount");
            return FetchOutcome::Discarded;
        }
        if state.latest_ticket != ticket || state.key != *key {
            debug!(
                screen = screen.label(),
                ticket,
                latest = state.latest_ticket,
                "dropping stale result"
            );
            return FetchOutcome::Discarded;
        }
        match result {
            Ok(raw) => {
                let page = decode_list::<S::Row>(&raw, screen.plural());
                state.phase = Phase::Succeeded;
                self.inner.slice.update(|collection| {
                    collection.set_succeeded(page.items, page.total, key.page, page.shape);
                });
                FetchOutcome::Committed
            }
            Err(error) => {
                let error = DataError::from(error);
                debug!(screen = screen.label(), %error, "list fetch failed");
                state.phase = Phase::Failed;
                self.inner
                    .slice
                    .update(|collection| collection.set_failed(error.to_string()));
                FetchOutcome::Failed
            }
        }
    }
}

impl<S: ListScreen> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn replace_page(key: &mut RequestKey, next: PageRequest) -> bool {
    if key.page == Some(next) {
        return false;
    }
    key.page = Some(next);
    true
}
