// crates/cli/src/output.rs
//! User-facing text: job errors and upload summaries.

use std::fmt::Write as _;

use ssa_report_core::{ConfigError, JobFailure, RequestError, UploadSummary};
use thiserror::Error;

const ERROR_HEADING: &str = "Uh oh! There was an error!";

/// A job that ran to a known failure. Carried through `anyhow` so the
/// top-level handler can tell it apart from fatal errors.
#[derive(Debug, Error)]
#[error("{endpoint} job failed: {failure}")]
pub struct JobFailed {
    pub endpoint: String,
    pub failure: JobFailure,
}

/// How to present an error that ended a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDisplay {
    pub text: String,
    /// Not yet reported to the diagnostics side channel.
    pub capture: bool,
}

pub fn describe_error(err: &anyhow::Error, contact_email: Option<&str>) -> ErrorDisplay {
    if let Some(failed) = err.downcast_ref::<JobFailed>() {
        return ErrorDisplay {
            text: failure_text(&failed.failure, contact_email),
            capture: false,
        };
    }

    // bad input from the user, nothing went wrong on the server
    if err.downcast_ref::<RequestError>().is_some() || err.downcast_ref::<ConfigError>().is_some() {
        return ErrorDisplay {
            text: format!("Error: {err:#}"),
            capture: false,
        };
    }

    ErrorDisplay {
        text: failure_text(&JobFailure::Unspecified, contact_email),
        capture: true,
    }
}

pub fn failure_text(failure: &JobFailure, contact_email: Option<&str>) -> String {
    match failure.message() {
        Some(message) => format!("{ERROR_HEADING} The server says: {message}"),
        None => match contact_email {
            Some(email) => format!(
                "{ERROR_HEADING}\nPlease try again. If that does not work, please contact us at {email}."
            ),
            None => format!("{ERROR_HEADING}\nPlease try again."),
        },
    }
}

pub fn upload_summary_text(summary: &UploadSummary) -> String {
    let mut out = String::new();
    let noun = if summary.count == 1 { "area" } else { "areas" };
    let _ = writeln!(out, "Upload {}: {} {noun}", summary.uuid, summary.count);

    if summary.fields.is_empty() {
        let _ = writeln!(out, "No attributes to group by; areas are reported together.");
    } else {
        let _ = writeln!(out, "Attributes:");
        for (field, unique) in &summary.fields {
            let _ = writeln!(out, "  {field} ({unique} unique values)");
        }
    }

    let _ = writeln!(out, "Datasets:");
    for (id, available) in &summary.available_datasets {
        let mark = if *available { "x" } else { " " };
        let _ = writeln!(out, "  [{mark}] {id}");
    }
    out
}

pub fn warnings_text(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    let mut out = String::from("The report was created with these warnings:\n");
    for error in errors {
        let _ = writeln!(out, "  - {error}");
    }
    Some(out)
}
