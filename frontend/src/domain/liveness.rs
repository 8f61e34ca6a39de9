//! Mount-scoped liveness flag.
//!
//! Every in-flight fetch holds a clone and checks it before committing. Once
//! the owning controller or view is unmounted, late completions are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Shared flag flipped to dead exactly once.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
    signal: Arc<watch::Sender<bool>>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            signal: Arc::new(watch::Sender::new(true)),
        }
    }
}

impl Liveness {
    /// Whether the owner is still mounted.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the owner as unmounted. Returns `false` if it already was.
    pub fn kill(&self) -> bool {
        let was_alive = self.alive.swap(false, Ordering::AcqRel);
        if was_alive {
            self.signal.send_replace(false);
        }
        was_alive
    }

    /// Resolve once [`Self::kill`] has been called.
    pub async fn dead(&self) {
        let mut receiver = self.signal.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail.
        let _ = receiver.wait_for(|alive| !*alive).await;
    }
}
