// crates/core/src/config.rs
//! Client configuration, read from environment variables.

use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_API_HOST: &str = "SSA_API_HOST";
pub const ENV_API_TOKEN: &str = "SSA_API_TOKEN";
pub const ENV_CONTACT_EMAIL: &str = "SSA_CONTACT_EMAIL";
pub const ENV_SENTRY_DSN: &str = "SENTRY_DSN";
pub const ENV_SENTRY_ENV: &str = "SENTRY_ENV";
pub const ENV_POLL_INTERVAL_MS: &str = "SSA_POLL_INTERVAL_MS";
pub const ENV_JOB_TIMEOUT_MS: &str = "SSA_JOB_TIMEOUT_MS";
pub const ENV_FAILED_FETCH_LIMIT: &str = "SSA_FAILED_FETCH_LIMIT";

const DEFAULT_SENTRY_ENV: &str = "development";

/// Cadence and limits of the status polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between status requests.
    pub interval: Duration,
    /// Give up once this much time has been spent sleeping.
    pub job_timeout: Duration,
    /// Give up after this many status requests fail to reach the server.
    pub failed_fetch_limit: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            job_timeout: Duration::from_millis(600_000),
            failed_fetch_limit: 5,
        }
    }
}

/// Everything needed to talk to the report API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme and host of the API, without a trailing slash
    /// (e.g. `https://ssa.example.org`).
    pub api_host: String,
    pub api_token: String,
    /// Shown to users when a job fails for no stated reason.
    pub contact_email: Option<String>,
    pub sentry_dsn: Option<String>,
    pub sentry_env: String,
    pub poll: PollConfig,
}

impl ApiConfig {
    pub fn new(api_host: impl Into<String>, api_token: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_host: normalize_host(api_host.into())?,
            api_token: api_token.into(),
            contact_email: None,
            sentry_dsn: None,
            sentry_env: DEFAULT_SENTRY_ENV.into(),
            poll: PollConfig::default(),
        })
    }

    /// Load configuration through a variable lookup, normally the process
    /// environment with command-line overrides on top.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_host = get(ENV_API_HOST).ok_or(ConfigError::MissingVar { name: ENV_API_HOST })?;
        let api_token = get(ENV_API_TOKEN).ok_or(ConfigError::MissingVar { name: ENV_API_TOKEN })?;

        let mut poll = PollConfig::default();
        if let Some(raw) = get(ENV_POLL_INTERVAL_MS) {
            // elapsed time only advances by the interval, so zero would never time out
            match parse_number(ENV_POLL_INTERVAL_MS, &raw)? {
                0 => return Err(ConfigError::invalid(ENV_POLL_INTERVAL_MS, raw, "must be positive")),
                ms => poll.interval = Duration::from_millis(ms),
            }
        }
        if let Some(raw) = get(ENV_JOB_TIMEOUT_MS) {
            poll.job_timeout = Duration::from_millis(parse_number(ENV_JOB_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_FAILED_FETCH_LIMIT) {
            let limit = parse_number(ENV_FAILED_FETCH_LIMIT, &raw)?;
            poll.failed_fetch_limit = u32::try_from(limit)
                .map_err(|_| ConfigError::invalid(ENV_FAILED_FETCH_LIMIT, raw, "value too large"))?;
        }

        Ok(Self {
            api_host: normalize_host(api_host)?,
            api_token,
            contact_email: get(ENV_CONTACT_EMAIL),
            sentry_dsn: get(ENV_SENTRY_DSN),
            sentry_env: get(ENV_SENTRY_ENV).unwrap_or_else(|| DEFAULT_SENTRY_ENV.into()),
            poll,
        })
    }
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(name, raw, "expected a non-negative integer"))
}

fn normalize_host(raw: String) -> Result<String, ConfigError> {
    let host = raw.trim().trim_end_matches('/');
    if !(host.starts_with("http://") || host.starts_with("https://")) {
        return Err(ConfigError::invalid(ENV_API_HOST, raw, "expected an http:// or https:// URL"));
    }
    Ok(host.to_string())
}
