//! Replace-only state containers shared between a controller and its readers.
//!
//! Each slice wraps a `tokio::sync::watch` channel. The owning controller is
//! the only writer; readers receive whole snapshots, so nobody ever observes a
//! half-applied update.

use std::sync::Arc;

use pagination::{EnvelopeShape, PageRequest};
use tokio::sync::watch;

/// Cached list for one request key.
///
/// ## Invariants
/// - `items` and `total` change only through [`Collection::set_succeeded`].
/// - A failed fetch leaves the previous `items` and `total` visible.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    /// Rows from the most recent successful fetch for the current key.
    pub items: Arc<[T]>,
    /// Page the rows belong to, for paginated screens.
    pub page: Option<PageRequest>,
    /// Total matching rows reported by the backend, unknown until loaded.
    pub total: Option<u64>,
    /// A fetch is in flight.
    pub is_loading: bool,
    /// Message from the last failed read.
    pub error: Option<String>,
    /// Envelope the last successful fetch arrived in.
    pub shape: EnvelopeShape,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Arc::from(Vec::new()),
            page: None,
            total: None,
            is_loading: false,
            error: None,
            shape: EnvelopeShape::default(),
        }
    }
}

impl<T> Collection<T> {
    /// Mark a fetch as started. Rows stay untouched.
    pub fn set_loading(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    /// Replace the rows wholesale.
    pub fn set_succeeded(
        &mut self,
        items: Vec<T>,
        total: u64,
        page: Option<PageRequest>,
        shape: EnvelopeShape,
    ) {
        self.items = Arc::from(items);
        self.total = Some(total);
        self.page = page;
        self.shape = shape;
        self.is_loading = false;
        self.error = None;
    }

    /// Record a read failure, keeping the stale rows.
    pub fn set_failed(&mut self, message: impl Into<String>) {
        self.is_loading = false;
        self.error = Some(message.into());
    }

    /// Drop the error banner without refetching.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Whether a fetch has completed successfully at least once.
    pub fn is_loaded(&self) -> bool {
        self.total.is_some()
    }
}

/// Cached single record, such as business settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// Value from the most recent successful fetch.
    pub value: Option<Arc<T>>,
    /// A fetch is in flight.
    pub is_loading: bool,
    /// Message from the last failed read.
    pub error: Option<String>,
}

impl<T> Default for Record<T> {
    fn default() -> Self {
        Self {
            value: None,
            is_loading: false,
            error: None,
        }
    }
}

impl<T> Record<T> {
    /// Mark a fetch as started.
    pub fn set_loading(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    /// Replace the value.
    pub fn set_succeeded(&mut self, value: T) {
        self.value = Some(Arc::new(value));
        self.is_loading = false;
        self.error = None;
    }

    /// Record a failure, keeping the stale value.
    pub fn set_failed(&mut self, message: impl Into<String>) {
        self.is_loading = false;
        self.error = Some(message.into());
    }
}

/// Single-writer, many-reader container around a state value.
#[derive(Debug)]
pub struct Slice<S> {
    sender: watch::Sender<S>,
}

/// Slice holding a paginated collection.
pub type DomainSlice<T> = Slice<Collection<T>>;
/// Slice holding one record.
pub type RecordSlice<T> = Slice<Record<T>>;

impl<S: Default> Default for Slice<S> {
    fn default() -> Self {
        Self {
            sender: watch::Sender::new(S::default()),
        }
    }
}

impl<S: Clone> Slice<S> {
    /// Current state.
    pub fn snapshot(&self) -> S {
        self.sender.borrow().clone()
    }

    /// Receiver that observes every committed state.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.sender.subscribe()
    }

    /// Apply `change` and notify readers.
    pub(crate) fn update(&self, change: impl FnOnce(&mut S)) {
        self.sender.send_modify(change);
    }
}
