// crates/core/src/lib.rs
//! Client for the Species Status Landscape Assessment report API.
//!
//! Upload a zipped boundary dataset, pick an attribute and indicator
//! datasets, and wait for the server-side report job to finish.

pub mod config;
pub mod error;
pub mod jobs;
pub mod report;
pub mod url;

pub use config::{ApiConfig, PollConfig};
pub use error::*;
pub use jobs::{
    FailureReport, FailureReporter, HttpTransport, JobFailure, JobId, JobOutcome, JobPayload,
    JobProgress, JobSubmission, JobTransport, TracingReporter,
};
pub use report::{DatasetSelection, ReportRequest, SummaryUnitType, UploadRequest, UploadSummary};
pub use url::{report_file_name, resolve_download_url};
