// crates/core/src/jobs/types.rs
//! Types for the job submission workflow.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-issued identifier for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a job as reported by the server.
///
/// The server also reports queue states (`deferred`, `queued`,
/// `in_progress`); anything that is not terminal is `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
    #[serde(other)]
    Pending,
}

/// Body of a response to a job submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SubmitBody {
    #[serde(default)]
    pub job: Option<JobId>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Latest known state of a job, replaced wholesale on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    #[serde(default)]
    pub status: Option<JobStatus>,
    /// 0–100
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    /// Reason for failure, present on failed jobs.
    #[serde(default)]
    pub detail: Option<String>,
    /// Opaque payload of a successful job.
    #[serde(default)]
    pub result: Option<Value>,
    /// Server-side task name (`inspect`, `create_report`).
    #[serde(default)]
    pub task: Option<String>,
}

impl JobStatusSnapshot {
    pub fn status(&self) -> JobStatus {
        self.status.unwrap_or(JobStatus::Pending)
    }

    /// Progress event for the caller, if the server reported progress.
    pub fn progress_update(&self) -> Option<JobProgress> {
        self.progress.map(|progress| JobProgress {
            progress,
            message: self.message.clone(),
            errors: self.errors.clone(),
        })
    }
}

/// Progress event passed to the caller's callback while a job is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobProgress {
    pub progress: u32,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

/// Why a job did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The server refused the submission (HTTP 400); reason is user-facing.
    Rejected(String),
    /// The server ran the job and it failed with the given reason.
    Failed(String),
    /// Status requests stopped reaching the server.
    NetworkErrors { failed_requests: u32 },
    /// The job was still running when the timeout elapsed.
    TimedOut,
    /// The polling loop ended without any recognizable cause.
    Unexpected,
    /// A caller caught a fatal [`JobError`](crate::JobError) and has nothing
    /// specific to show.
    Unspecified,
}

impl JobFailure {
    /// Message suitable for showing to the user, if there is one.
    pub fn message(&self) -> Option<&str> {
        match self {
            JobFailure::Rejected(detail) | JobFailure::Failed(detail) => Some(detail),
            JobFailure::NetworkErrors { .. } => Some(
                "network errors were encountered.  The server may be too busy or your network \
                 connection may be having problems.  Please try again in a few minutes.",
            ),
            JobFailure::TimedOut => {
                Some("timeout while running job.  Your areas may be too big or complex.")
            }
            JobFailure::Unexpected => Some(
                "unexpected errors prevented your job from completing successfully.  Please try again.",
            ),
            JobFailure::Unspecified => None,
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => f.write_str(message),
            None => f.write_str("an unspecified error occurred"),
        }
    }
}

/// Terminal result of a submitted job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success {
        /// The server's `result` payload (`Null` if absent).
        result: Value,
        /// Partial-failure annotations on an otherwise successful job.
        errors: Vec<String>,
    },
    Error(JobFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            JobOutcome::Error(failure) => Some(failure),
            JobOutcome::Success { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<(Value, Vec<String>), JobFailure> {
        match self {
            JobOutcome::Success { result, errors } => Ok((result, errors)),
            JobOutcome::Error(failure) => Err(failure),
        }
    }
}
