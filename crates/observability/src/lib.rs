// crates/observability/src/lib.rs
//! Logging and error reporting for the report client.
//!
//! Log lines go to stderr through `tracing-subscriber`. When a Sentry DSN is
//! configured, log events become breadcrumbs and job failures are captured
//! as Sentry events through [`SentryReporter`].

use std::sync::Arc;

use serde_json::Value;
use sentry_tracing::EventFilter;
use ssa_report_core::{ApiConfig, FailureReport, FailureReporter, TracingReporter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Checked before `RUST_LOG`.
pub const ENV_LOG_FILTER: &str = "SSA_REPORT_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn,ssa_report=info";

/// Pick the log filter directive: `SSA_REPORT_LOG`, then `RUST_LOG`, then the
/// default. Blank values are skipped.
pub fn log_directive<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    [ENV_LOG_FILTER, "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber.
///
/// `verbose` raises this client's own crates to `debug` on top of whatever
/// the environment asks for.
pub fn init_tracing(verbose: bool) -> Result<(), TryInitError> {
    let mut directive = log_directive(|key| std::env::var(key).ok());
    if verbose {
        directive.push_str(",ssa_report=debug");
    }

    let sentry_layer = sentry_tracing::layer().event_filter(|md| match *md.level() {
        tracing::Level::TRACE | tracing::Level::DEBUG => EventFilter::Ignore,
        // failures are captured explicitly by SentryReporter
        _ => EventFilter::Breadcrumb,
    });

    tracing_subscriber::registry()
        .with(env_filter(&directive))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_layer)
        .try_init()
}

/// Start the Sentry client if a DSN is configured. Keep the guard alive for
/// the life of the process so pending events are flushed on exit.
pub fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.sentry_env.clone().into()),
            ..Default::default()
        },
    ));

    if guard.is_enabled() {
        tracing::debug!(environment = %config.sentry_env, "Sentry enabled");
        Some(guard)
    } else {
        tracing::warn!("Sentry DSN is set but the client could not be enabled");
        None
    }
}

/// Sends job failures to Sentry, grouped by job endpoint, after handing
/// them to a local reporter (`TracingReporter` unless replaced).
#[derive(Clone)]
pub struct SentryReporter {
    local: Arc<dyn FailureReporter>,
}

impl SentryReporter {
    pub fn new() -> Self {
        Self::with_local(Arc::new(TracingReporter))
    }

    pub fn with_local(local: Arc<dyn FailureReporter>) -> Self {
        Self { local }
    }
}

impl Default for SentryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureReporter for SentryReporter {
    fn report(&self, report: &FailureReport) {
        self.local.report(report);

        sentry::with_scope(
            |scope| {
                scope.set_fingerprint(Some(&[report.endpoint.as_str()]));
                scope.set_tag("endpoint", &report.endpoint);
                if let Some(data) = &report.data {
                    scope.set_extra("data", data.clone());
                }
            },
            || sentry::capture_message(&report.message, sentry::Level::Error),
        );
    }
}

/// Report a fatal error from outside the job workflow. Logged always, sent
/// to Sentry when a client is bound.
pub fn capture_error(endpoint: &str, error: &str) {
    SentryReporter::new().report(&FailureReport {
        endpoint: endpoint.to_string(),
        message: format!("Unhandled error from {endpoint}"),
        data: Some(Value::String(error.to_string())),
    });
}
