// crates/core/src/jobs/submission.rs
//! Submit a job and drive it to a terminal state.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::diagnostics::{FailureReport, FailureReporter, TracingReporter};
use super::payload::JobPayload;
use super::transport::{JobTransport, PollAttempt};
use super::types::{JobFailure, JobId, JobOutcome, JobProgress, JobStatus, JobStatusSnapshot, SubmitBody};
use crate::config::PollConfig;
use crate::error::JobError;

/// Status endpoint used by every job type the report API runs.
pub const DEFAULT_STATUS_PATH: &str = "reports/status/{job}";

/// Submits work to a job endpoint and polls it until it finishes.
///
/// Each call to [`submit`](Self::submit) is independent: it owns its own
/// counters and callback, and performs exactly one submission followed by
/// strictly sequential status polls.
pub struct JobSubmission<T> {
    transport: T,
    poll: PollConfig,
    status_path: String,
    reporter: Arc<dyn FailureReporter>,
}

impl<T: JobTransport> JobSubmission<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll: PollConfig::default(),
            status_path: DEFAULT_STATUS_PATH.to_string(),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// A zero `interval` is replaced by the default one: elapsed time only
    /// advances by the interval, so the loop could never time out.
    pub fn with_poll_config(mut self, mut poll: PollConfig) -> Self {
        if poll.interval.is_zero() {
            tracing::warn!("Zero poll interval; using the default");
            poll.interval = PollConfig::default().interval;
        }
        self.poll = poll;
        self
    }

    /// Status path template relative to `/api/`; `{job}` is replaced by the
    /// job id.
    pub fn with_status_path(mut self, template: impl Into<String>) -> Self {
        self.status_path = template.into();
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit `payload` to `endpoint` and wait for the job to finish.
    ///
    /// `on_progress` is called for every pending status that carries a
    /// progress value, in the order the server reported them.
    ///
    /// Anticipated failures come back as `Ok(JobOutcome::Error(_))`; `Err`
    /// means the server said something this workflow cannot interpret.
    pub async fn submit<F>(
        &self,
        endpoint: &str,
        payload: JobPayload,
        mut on_progress: F,
    ) -> Result<JobOutcome, JobError>
    where
        F: FnMut(JobProgress),
    {
        let endpoint = endpoint.trim_matches('/');
        if endpoint.is_empty() {
            return Err(JobError::EmptyEndpoint);
        }

        tracing::debug!(endpoint, fields = ?payload.describe(), "Submitting job");
        let reply = self.transport.submit(endpoint, payload).await?;

        match reply.status {
            200 => {
                let body: SubmitBody = decode(endpoint, parse_json(endpoint, &reply.body)?)?;
                let job_id = body
                    .job
                    .ok_or_else(|| JobError::malformed(endpoint, "response has no job id"))?;
                tracing::info!(endpoint, job_id = %job_id, "Job submitted");
                self.poll_job(endpoint, &job_id, &mut on_progress).await
            }
            400 => {
                let data = parse_json(endpoint, &reply.body)?;
                let body: SubmitBody = decode(endpoint, data.clone())?;
                tracing::warn!(endpoint, detail = ?body.detail, "Bad job submit request");
                self.report(endpoint, "Bad job submit request", Some(data));
                match body.detail {
                    Some(detail) => Ok(JobOutcome::Error(JobFailure::Rejected(detail))),
                    None => Err(JobError::MissingDetail {
                        endpoint: endpoint.to_string(),
                        status: reply.status,
                    }),
                }
            }
            status => {
                let data = serde_json::from_str(&reply.body)
                    .unwrap_or_else(|_| Value::String(reply.body.clone()));
                tracing::error!(endpoint, status, "Bad job submit response");
                self.report(endpoint, "Bad job submit response", Some(data));
                Err(JobError::UnexpectedSubmitStatus {
                    endpoint: endpoint.to_string(),
                    status,
                    body: reply.body,
                })
            }
        }
    }

    async fn poll_job<F>(
        &self,
        endpoint: &str,
        job_id: &JobId,
        on_progress: &mut F,
    ) -> Result<JobOutcome, JobError>
    where
        F: FnMut(JobProgress),
    {
        let status_path = self.status_path_for(job_id);
        let mut elapsed = Duration::ZERO;
        let mut failed_requests: u32 = 0;

        while elapsed < self.poll.job_timeout && failed_requests < self.poll.failed_fetch_limit {
            let reply = match self.transport.poll(&status_path).await {
                PollAttempt::Reply(reply) => reply,
                PollAttempt::NetworkError(reason) => {
                    failed_requests += 1;
                    tracing::warn!(job_id = %job_id, failed_requests, %reason, "Job status request failed");
                    elapsed += self.pause().await;
                    continue;
                }
            };

            let data = parse_json(&status_path, &reply.body)?;
            let snapshot: JobStatusSnapshot = decode(&status_path, data.clone())?;

            match next_step(reply.status, &snapshot) {
                PollStep::Fail(detail) => {
                    self.report(endpoint, "Job failed", Some(data));
                    return match detail {
                        Some(detail) => {
                            tracing::warn!(job_id = %job_id, %detail, "Job failed");
                            Ok(JobOutcome::Error(JobFailure::Failed(detail)))
                        }
                        None => Err(JobError::JobFailed {
                            job_id: job_id.to_string(),
                            status: reply.status,
                        }),
                    };
                }
                PollStep::Succeed => {
                    tracing::info!(
                        job_id = %job_id,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Job completed"
                    );
                    return Ok(JobOutcome::Success {
                        result: snapshot.result.unwrap_or(Value::Null),
                        errors: snapshot.errors.unwrap_or_default(),
                    });
                }
                PollStep::Continue(progress) => {
                    if let Some(progress) = progress {
                        tracing::debug!(job_id = %job_id, progress = progress.progress, "Job progress");
                        on_progress(progress);
                    }
                    elapsed += self.pause().await;
                }
            }
        }

        Ok(JobOutcome::Error(self.exhausted(endpoint, job_id, failed_requests, elapsed)))
    }

    /// Outcome when the loop runs out of time or retries without a terminal
    /// status. Fetch failures take precedence over the timeout.
    fn exhausted(&self, endpoint: &str, job_id: &JobId, failed_requests: u32, elapsed: Duration) -> JobFailure {
        let (failure, message) = if failed_requests > 0 {
            (
                JobFailure::NetworkErrors { failed_requests },
                format!("Job encountered {failed_requests} fetch errors"),
            )
        } else if elapsed >= self.poll.job_timeout {
            (JobFailure::TimedOut, "Job timed out".to_string())
        } else {
            (JobFailure::Unexpected, "Job had an unexpected error".to_string())
        };

        tracing::warn!(
            job_id = %job_id,
            failed_requests,
            elapsed_ms = elapsed.as_millis() as u64,
            "{message}"
        );
        self.report(endpoint, message, None);
        failure
    }

    async fn pause(&self) -> Duration {
        tokio::time::sleep(self.poll.interval).await;
        self.poll.interval
    }

    fn status_path_for(&self, job_id: &JobId) -> String {
        self.status_path
            .replace("{job}", &urlencoding::encode(job_id.as_str()))
    }

    fn report(&self, endpoint: &str, message: impl Into<String>, data: Option<Value>) {
        self.reporter.report(&FailureReport {
            endpoint: endpoint.to_string(),
            message: message.into(),
            data,
        });
    }
}

/// What the loop does after one status response.
#[derive(Debug, Clone, PartialEq)]
enum PollStep {
    /// Terminal failure, with the server's reason if it gave one.
    Fail(Option<String>),
    Succeed,
    /// Still running; report progress if any, then wait.
    Continue(Option<JobProgress>),
}

fn next_step(http_status: u16, snapshot: &JobStatusSnapshot) -> PollStep {
    if http_status != 200 || snapshot.status() == JobStatus::Failed {
        return PollStep::Fail(snapshot.detail.clone().filter(|d| !d.is_empty()));
    }
    match snapshot.status() {
        JobStatus::Success => PollStep::Succeed,
        _ => PollStep::Continue(snapshot.progress_update()),
    }
}

fn parse_json(source_name: &str, body: &str) -> Result<Value, JobError> {
    serde_json::from_str(body).map_err(|e| JobError::malformed(source_name, e))
}

fn decode<D: DeserializeOwned>(source_name: &str, value: Value) -> Result<D, JobError> {
    serde_json::from_value(value).map_err(|e| JobError::malformed(source_name, e))
}
