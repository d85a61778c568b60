// crates/core/src/jobs/diagnostics.rs
//! Out-of-band reporting of job failures.

use serde_json::Value;

/// A job failure worth telling operators about.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    /// Job endpoint the failure belongs to (`upload`, `report`, ...).
    pub endpoint: String,
    pub message: String,
    /// Server response body, when there was one.
    pub data: Option<Value>,
}

/// Side channel that receives every terminal job failure before the
/// workflow returns to its caller.
pub trait FailureReporter: Send + Sync {
    fn report(&self, report: &FailureReport);
}

/// Default reporter: logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, report: &FailureReport) {
        match &report.data {
            Some(data) => tracing::error!(
                endpoint = %report.endpoint,
                data = %data,
                "{}",
                report.message
            ),
            None => tracing::error!(endpoint = %report.endpoint, "{}", report.message),
        }
    }
}
