// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading client configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable not set: {name}")]
    MissingVar { name: &'static str },

    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
            reason,
        }
    }
}

/// Conditions the job workflow does not know how to normalize into a
/// [`JobOutcome`](crate::jobs::JobOutcome).
///
/// Everything the server is expected to say (bad request, failed job with a
/// reason, flaky network, timeout) comes back as an outcome instead. These
/// are for the caller's last-resort handler.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job endpoint path must not be empty")]
    EmptyEndpoint,

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from job endpoint {endpoint} (HTTP {status}): {body}")]
    UnexpectedSubmitStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Job endpoint {endpoint} rejected the request (HTTP {status}) without a reason")]
    MissingDetail { endpoint: String, status: u16 },

    #[error("Job {job_id} failed (HTTP {status}) without a reason")]
    JobFailed { job_id: String, status: u16 },

    #[error("Malformed JSON from {source_name}: {message}")]
    MalformedJson { source_name: String, message: String },

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),
}

impl JobError {
    pub fn malformed(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedJson {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

/// Errors building report requests or reading report inputs.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Upload must be a .zip file: {path}")]
    NotZip { path: PathBuf },

    #[error("Upload file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Attribute {field:?} is not one of the uploaded dataset's attributes")]
    UnknownAttribute { field: String },

    #[error("Dataset {id:?} is not available for this area")]
    UnknownDataset { id: String },

    #[error("No datasets selected for report")]
    NoDatasetsSelected,

    #[error("Unknown summary unit type: {0:?}")]
    UnknownSummaryUnit(String),

    #[error("Upload result is malformed: {0}")]
    MalformedUploadResult(String),
}

impl RequestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingVar { name: "SSA_API_HOST" };
        assert!(err.to_string().contains("SSA_API_HOST"));

        let err = ConfigError::invalid("SSA_JOB_TIMEOUT_MS", "ten", "expected milliseconds");
        assert!(err.to_string().contains("\"ten\""));
        assert!(err.to_string().contains("expected milliseconds"));
    }

    #[test]
    fn test_job_error_display() {
        let err = JobError::JobFailed {
            job_id: "abc123".into(),
            status: 500,
        };
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("500"));

        let err = JobError::malformed("reports/status/abc123", "expected value at line 1");
        assert!(err.to_string().contains("reports/status/abc123"));
    }

    #[test]
    fn test_request_error_io_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = RequestError::io("/tmp/areas.zip", io_err);
        assert!(matches!(err, RequestError::NotFound { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = RequestError::io("/tmp/areas.zip", io_err);
        assert!(matches!(err, RequestError::Io { .. }));
    }
}
