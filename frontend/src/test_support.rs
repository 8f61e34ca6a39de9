//! Shared test doubles for controller, polling and screen tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use serde_json::Value;
use tokio::sync::{oneshot, watch};

use crate::domain::controller::ControllerPorts;
use crate::domain::ports::{ApiRequest, HttpMethod, Notifier, RemoteDataClient, RemoteError};

type Reply = Result<Value, RemoteError>;
type Route = (HttpMethod, String);

enum Scripted {
    Now(Reply),
    Deferred(oneshot::Receiver<Reply>),
}

#[derive(Default)]
struct Script {
    queued: BTreeMap<Route, VecDeque<Scripted>>,
    sticky: BTreeMap<Route, Reply>,
}

/// Scripted [`RemoteDataClient`] that records every request.
///
/// Replies are matched by method and path. Queued replies are consumed in
/// request order; a sticky reply answers whenever the queue for its route is
/// empty. Unscripted requests fail with a network error.
pub struct StubRemoteClient {
    script: Mutex<Script>,
    seen: Mutex<Vec<ApiRequest>>,
    seen_count: watch::Sender<usize>,
}

impl Default for StubRemoteClient {
    fn default() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            seen: Mutex::new(Vec::new()),
            seen_count: watch::Sender::new(0),
        }
    }
}

/// Handle that settles one deferred reply.
pub struct DeferredReply(oneshot::Sender<Reply>);

impl DeferredReply {
    /// Deliver `reply` to the waiting request.
    pub fn resolve(self, reply: Reply) {
        let _ = self.0.send(reply);
    }
}

impl StubRemoteClient {
    /// Empty script.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an immediate reply for `method path`.
    pub fn reply(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.push(method, path, Scripted::Now(reply));
    }

    /// Queue a reply that stays pending until the handle resolves it.
    pub fn defer(&self, method: HttpMethod, path: &str) -> DeferredReply {
        let (sender, receiver) = oneshot::channel();
        self.push(method, path, Scripted::Deferred(receiver));
        DeferredReply(sender)
    }

    /// Answer `method path` with `reply` whenever nothing is queued.
    pub fn always(&self, method: HttpMethod, path: &str, reply: Reply) {
        lock(&self.script)
            .sticky
            .insert((method, path.to_owned()), reply);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.seen).clone()
    }

    /// Requests received for `method path`.
    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<ApiRequest> {
        lock(&self.seen)
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .cloned()
            .collect()
    }

    /// Wait until at least `count` requests have been received.
    pub async fn wait_for_requests(&self, count: usize) {
        let mut receiver = self.seen_count.subscribe();
        let _ = receiver.wait_for(|seen| *seen >= count).await;
    }

    fn push(&self, method: HttpMethod, path: &str, scripted: Scripted) {
        lock(&self.script)
            .queued
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(scripted);
    }

    fn next_reply(&self, request: &ApiRequest) -> Scripted {
        let route = (request.method, request.path.clone());
        let mut script = lock(&self.script);
        if let Some(next) = script.queued.get_mut(&route).and_then(VecDeque::pop_front) {
            return next;
        }
        match script.sticky.get(&route) {
            Some(reply) => Scripted::Now(reply.clone()),
            None => Scripted::Now(Err(RemoteError::network(format!(
                "unscripted request {} {}",
                request.method, request.path
            )))),
        }
    }
}

#[async_trait]
impl RemoteDataClient for StubRemoteClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, RemoteError> {
        let scripted = self.next_reply(&request);
        lock(&self.seen).push(request);
        self.seen_count.send_modify(|seen| *seen += 1);
        match scripted {
            Scripted::Now(reply) => reply,
            Scripted::Deferred(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(RemoteError::network("deferred reply dropped"))),
        }
    }
}

/// Notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Transient success toast.
    Success(String),
    /// Error toast.
    Error(String),
}

/// [`Notifier`] that keeps every toast for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Fresh recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Toasts shown so far.
    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        lock(&self.notices).push(Notice::Success(message.to_owned()));
    }

    fn error(&self, message: &str) {
        lock(&self.notices).push(Notice::Error(message.to_owned()));
    }
}

/// Clock pinned to a settable instant.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// Clock reading `now`.
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    /// Clock reading noon UTC on the given day.
    pub fn on(year: i32, month: u32, day: u32) -> Arc<Self> {
        let now = Utc
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::at(now)
    }

    /// Move the clock forward.
    pub fn advance_days(&self, days: i64) {
        *lock(&self.0) += TimeDelta::days(days);
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Ports wired to the given stub and recorder, with the clock on 2026-03-10.
pub fn stub_ports(client: &Arc<StubRemoteClient>, notifier: &Arc<RecordingNotifier>) -> ControllerPorts {
    ControllerPorts::new(
        Arc::clone(client) as Arc<dyn RemoteDataClient>,
        Arc::clone(notifier) as Arc<dyn Notifier>,
        FixedClock::on(2026, 3, 10),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
