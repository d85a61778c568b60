// crates/core/src/jobs/mod.rs
//! Long-running server jobs: submit work, poll until it finishes.
//!
//! Provides:
//! - `JobSubmission`: submit + poll workflow, normalizing failures into `JobOutcome`
//! - `JobTransport`: HTTP seam, with `HttpTransport` for the report API
//! - `JobPayload`: multipart form fields for a submission
//! - `FailureReporter`: side channel for terminal failures

pub mod diagnostics;
pub mod payload;
pub mod submission;
pub mod transport;
pub mod types;

pub use diagnostics::{FailureReport, FailureReporter, TracingReporter};
pub use payload::{JobPayload, PayloadValue};
pub use submission::{JobSubmission, DEFAULT_STATUS_PATH};
pub use transport::{HttpReply, HttpTransport, JobTransport, PollAttempt};
pub use types::{JobFailure, JobId, JobOutcome, JobProgress, JobStatus, JobStatusSnapshot};
