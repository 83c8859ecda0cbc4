use cp_core::ports::{Notifier, Severity};

/// Notifier that lands everything in the tracing log.
///
/// Hosts with a UI wrap or replace this with their toast/alert surface; the
/// sync engine itself only needs somewhere non-blocking to report to.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "user_notice", "{message}"),
            Severity::Warning => tracing::warn!(target: "user_notice", "{message}"),
            Severity::Error => tracing::error!(target: "user_notice", "{message}"),
        }
    }
}
