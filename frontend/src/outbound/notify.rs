//! Notifier that routes toasts to the tracing subscriber.
//!
//! Headless hosts such as `fleet-monitor` have no toast surface; success
//! messages are logged at info level and failures at warn level.

use tracing::{info, warn};

use crate::domain::ports::Notifier;

/// [`Notifier`] that logs every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(target: "console::toast", %message, "success");
    }

    fn error(&self, message: &str) {
        warn!(target: "console::toast", %message, "failure");
    }
}
