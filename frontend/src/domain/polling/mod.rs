//! Fixed-interval polling views.
//!
//! A mounted [`PollingView`] fetches immediately and then once per interval.
//! At most one poll is in flight: a tick that fires while the previous fetch
//! is unresolved is skipped, not queued. Unmounting cancels the timer and
//! flips the liveness flag, so a fetch that resolves afterwards commits
//! nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::domain::controller::FetchOutcome;
use crate::domain::ports::{ApiRequest, RemoteDataClient};
use crate::domain::{DataError, Liveness, Slice};

/// Endpoint polled by a [`PollingView`].
pub trait PollSource: Send + Sync + 'static {
    /// Decoded snapshot.
    type Snapshot: Clone + Send + Sync + 'static;

    /// Name used in logs.
    fn label(&self) -> &'static str;

    /// Request issued on every tick.
    fn request(&self) -> ApiRequest;

    /// Decode one response body.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] when the body cannot be interpreted.
    fn decode(&self, raw: Value) -> Result<Self::Snapshot, DataError>;
}

/// State published by a polling view.
#[derive(Debug, Clone)]
pub struct PollState<T> {
    /// Most recent successful snapshot.
    pub latest: Option<Arc<T>>,
    /// A poll is in flight.
    pub is_loading: bool,
    /// Message from the last failed poll.
    pub error: Option<String>,
    /// Polls that committed a snapshot.
    pub completed: u64,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            latest: None,
            is_loading: false,
            error: None,
            completed: 0,
        }
    }
}

/// Result of asking for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The poll ran and finished with this outcome.
    Ran(FetchOutcome),
    /// The previous poll was still in flight, or the view is not mounted.
    Skipped,
}

struct PollInner<S: PollSource> {
    source: S,
    client: Arc<dyn RemoteDataClient>,
    interval: Duration,
    slice: Slice<PollState<S::Snapshot>>,
    liveness: Liveness,
    mounted: AtomicBool,
    in_flight: AtomicBool,
    skipped: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Releases the in-flight flag when the poll finishes or is dropped.
struct InFlight<S: PollSource>(Arc<PollInner<S>>);

impl<S: PollSource> Drop for InFlight<S> {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// Interval-driven view over one [`PollSource`].
pub struct PollingView<S: PollSource> {
    inner: Arc<PollInner<S>>,
}

impl<S: PollSource> Clone for PollingView<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PollSource> PollingView<S> {
    /// Build an unmounted view polling every `interval`.
    pub fn new(source: S, client: Arc<dyn RemoteDataClient>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(PollInner {
                source,
                client,
                interval,
                slice: Slice::default(),
                liveness: Liveness::default(),
                mounted: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
                skipped: AtomicU64::new(0),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Polled source.
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Start the timer. The first tick fires immediately. Must be called
    /// within a tokio runtime; later calls are ignored.
    pub fn mount(&self) {
        if !self.inner.liveness.is_alive() || self.inner.mounted.swap(true, Ordering::AcqRel) {
            return;
        }
        let view = self.clone();
        let handle = tokio::spawn(async move { view.run_timer().await });
        *self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Cancel the timer and drop any result still in flight. Final.
    pub fn unmount(&self) {
        if !self.inner.liveness.kill() {
            return;
        }
        let timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
        }
        debug!(source = self.inner.source.label(), "polling view unmounted");
    }

    /// Poll now, outside the timer, under the same skip rule.
    pub async fn poll_now(&self) -> TickOutcome {
        match self.begin() {
            Some(guard) => {
                let outcome = self.poll_once().await;
                drop(guard);
                TickOutcome::Ran(outcome)
            }
            None => TickOutcome::Skipped,
        }
    }

    /// Ticks skipped because a poll was still in flight.
    pub fn skipped_ticks(&self) -> u64 {
        self.inner.skipped.load(Ordering::Acquire)
    }

    /// Whether a poll is in flight.
    pub fn is_polling(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Current state.
    pub fn snapshot(&self) -> PollState<S::Snapshot> {
        self.inner.slice.snapshot()
    }

    /// Receiver for every published state.
    pub fn subscribe(&self) -> watch::Receiver<PollState<S::Snapshot>> {
        self.inner.slice.subscribe()
    }

    async fn run_timer(&self) {
        let mut ticker = tokio::time::interval(self.inner.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = self.inner.liveness.dead() => break,
                _ = ticker.tick() => {
                    if let Some(guard) = self.begin() {
                        let view = self.clone();
                        tokio::spawn(async move {
                            view.poll_once().await;
                            drop(guard);
                        });
                    }
                }
            }
        }
    }

    fn begin(&self) -> Option<InFlight<S>> {
        if !self.inner.mounted.load(Ordering::Acquire) || !self.inner.liveness.is_alive() {
            return None;
        }
        if self.inner.in_flight.swap(true, Ordering::AcqRel) {
            let skipped = self.inner.skipped.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(source = self.inner.source.label(), skipped, "previous poll unresolved; skipping tick");
            return None;
        }
        Some(InFlight(Arc::clone(&self.inner)))
    }

    async fn poll_once(&self) -> FetchOutcome {
        let inner = &self.inner;
        inner.slice.update(|state| {
            state.is_loading = true;
            state.error = None;
        });
        let result = inner.client.request(inner.source.request()).await;
        if !inner.liveness.is_alive() {
            debug!(source = inner.source.label(), "dropping poll result after unmount");
            inner.slice.update(|state| state.is_loading = false);
            return FetchOutcome::Discarded;
        }
        match result
            .map_err(DataError::from)
            .and_then(|raw| inner.source.decode(raw))
        {
            Ok(snapshot) => {
                inner.slice.update(|state| {
                    state.latest = Some(Arc::new(snapshot));
                    state.is_loading = false;
                    state.completed += 1;
                });
                FetchOutcome::Committed
            }
            Err(error) => {
                debug!(source = inner.source.label(), %error, "poll failed");
                inner.slice.update(|state| {
                    state.is_loading = false;
                    state.error = Some(error.to_string());
                });
                FetchOutcome::Failed
            }
        }
    }
}
