/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Non-blocking user notification surface.
///
/// Every failure in the sync core degrades to one of these instead of
/// crossing a component boundary unhandled.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}
