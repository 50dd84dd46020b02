//! Analytics side channel.

use tracing::debug;

/// Fire-and-forget product analytics.
///
/// Implementations must never fail the caller; delivery problems stay inside
/// the sink.
pub trait AnalyticsSink: Send + Sync {
    fn log_event(&self, name: &str, params: &[(&str, &str)]);
}

/// Writes events to the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn log_event(&self, name: &str, params: &[(&str, &str)]) {
        let rendered = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        debug!(event = %name, params = %rendered, "analytics event");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn log_event(&self, _name: &str, _params: &[(&str, &str)]) {}
}
