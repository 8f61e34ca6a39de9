//! Driven port for transient user notifications (toasts).

/// Sink for mutation outcome messages.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show a transient success message.
    fn success(&self, message: &str);

    /// Show a blocking error message for a failed write.
    fn error(&self, message: &str);
}

/// Notifier that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn success(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}
