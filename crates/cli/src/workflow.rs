// crates/cli/src/workflow.rs
//! Upload, report, and download steps, each driven through the job API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde_json::Value;
use ssa_report_core::{
    report_file_name, resolve_download_url, ApiConfig, DatasetSelection, FailureReporter,
    HttpTransport, JobOutcome, JobPayload, JobSubmission, ReportRequest, SummaryUnitType,
    UploadRequest, UploadSummary,
};
use tokio::io::AsyncWriteExt;

use crate::output::JobFailed;
use crate::progress::{ProgressView, REPORT_MESSAGE, UPLOAD_MESSAGE};

/// A finished report job: where to fetch the spreadsheet, and any
/// per-dataset problems the server ran into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResult {
    pub result: String,
    pub warnings: Vec<String>,
}

pub struct ReportClient {
    config: ApiConfig,
    jobs: JobSubmission<HttpTransport>,
    show_progress: bool,
}

impl ReportClient {
    pub fn new(config: ApiConfig, reporter: Arc<dyn FailureReporter>) -> Self {
        let jobs = JobSubmission::new(HttpTransport::from_config(&config))
            .with_poll_config(config.poll)
            .with_reporter(reporter);
        Self {
            config,
            jobs,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Upload a zipped dataset and wait for the server to inspect it.
    pub async fn upload(&self, path: &Path, name: Option<String>) -> anyhow::Result<UploadSummary> {
        let request = UploadRequest::from_path(path, name).await?;
        let endpoint = request.endpoint();
        let (result, _) = self
            .run_job(endpoint, request.into_payload(), UPLOAD_MESSAGE)
            .await?;
        Ok(UploadSummary::from_result(result)?)
    }

    pub async fn report(&self, request: ReportRequest) -> anyhow::Result<ReportResult> {
        let endpoint = request.endpoint();
        let (result, warnings) = self
            .run_job(endpoint, request.into_payload(), REPORT_MESSAGE)
            .await?;
        report_result(endpoint, result, warnings)
    }

    pub async fn summary(&self, unit: SummaryUnitType, id: &str) -> anyhow::Result<ReportResult> {
        let endpoint = unit.endpoint(id);
        let (result, warnings) = self
            .run_job(&endpoint, JobPayload::new(), REPORT_MESSAGE)
            .await?;
        report_result(&endpoint, result, warnings)
    }

    /// Upload, pick an attribute and datasets, create the report, and save it.
    ///
    /// With no `datasets`, every dataset available for the uploaded areas is
    /// included; `exclude` is applied after.
    pub async fn run(&self, options: RunOptions) -> anyhow::Result<(PathBuf, Vec<String>)> {
        let summary = self.upload(&options.file, options.name.clone()).await?;
        tracing::info!(uuid = %summary.uuid, count = summary.count, "Upload inspected");

        let field = summary.validate_attribute(options.field.as_deref())?;
        let mut selection = summary.dataset_selection();
        if !options.datasets.is_empty() {
            selection.only(options.datasets.iter().map(String::as_str))?;
        }
        exclude(&mut selection, &options.exclude)?;

        let request = ReportRequest::new(summary.uuid, selection)?
            .with_field(field)
            .with_name(options.name.clone());
        let report = self.report(request).await?;

        let path = self
            .download(&report.result, options.name.as_deref(), options.output.as_deref())
            .await?;
        Ok((path, report.warnings))
    }

    /// Fetch a finished report into `output`, which may be a file or an
    /// existing directory. Defaults to the current directory.
    pub async fn download(
        &self,
        result: &str,
        name: Option<&str>,
        output: Option<&Path>,
    ) -> anyhow::Result<PathBuf> {
        let url = resolve_download_url(&self.config.api_host, result);
        let path = output_path(output, name);
        tracing::debug!(%url, path = %path.display(), "Downloading report");

        let mut response = self
            .jobs
            .transport()
            .client()
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?
            .error_for_status()
            .with_context(|| format!("Failed to download {url}"))?;

        // Body goes to a temporary file beside the destination; it replaces
        // `path` only after the last chunk is written.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
        let mut file = tokio::fs::File::from_std(
            temp.reopen()
                .with_context(|| format!("Failed to open {}", temp.path().display()))?,
        );

        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Failed to read {url}"))?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", temp.path().display()))?;
            written += chunk.len();
        }
        file.flush().await?;
        drop(file);

        temp.persist(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;

        tracing::info!(path = %path.display(), bytes = written, "Report saved");
        Ok(path)
    }

    async fn run_job(
        &self,
        endpoint: &str,
        payload: JobPayload,
        default_message: &str,
    ) -> anyhow::Result<(Value, Vec<String>)> {
        let mut view = if self.show_progress {
            ProgressView::new(default_message)
        } else {
            ProgressView::hidden(default_message)
        };

        let outcome = self
            .jobs
            .submit(endpoint, payload, |update| view.update(&update))
            .await;

        match outcome {
            Ok(JobOutcome::Success { result, errors }) => {
                view.finish();
                Ok((result, errors))
            }
            Ok(JobOutcome::Error(failure)) => {
                view.abandon();
                Err(JobFailed {
                    endpoint: endpoint.to_string(),
                    failure,
                }
                .into())
            }
            Err(e) => {
                view.abandon();
                Err(e.into())
            }
        }
    }
}

/// Inputs of [`ReportClient::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub file: PathBuf,
    pub field: Option<String>,
    pub datasets: Vec<String>,
    pub exclude: Vec<String>,
    pub name: Option<String>,
    pub output: Option<PathBuf>,
}

/// Deselect `ids`; all or nothing.
pub fn exclude(selection: &mut DatasetSelection, ids: &[String]) -> anyhow::Result<()> {
    selection.update(ids.iter().map(|id| (id.as_str(), false)))?;
    Ok(())
}

fn report_result(endpoint: &str, result: Value, warnings: Vec<String>) -> anyhow::Result<ReportResult> {
    match result {
        Value::String(result) if !result.is_empty() => Ok(ReportResult { result, warnings }),
        other => Err(anyhow!("{endpoint} job returned no report path: {other}")),
    }
}

fn output_path(output: Option<&Path>, name: Option<&str>) -> PathBuf {
    match output {
        Some(dir) if dir.is_dir() => dir.join(report_file_name(name)),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(report_file_name(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use ssa_report_core::{JobFailure, TracingReporter};
    use std::io::Write as _;

    fn client(server: &mockito::ServerGuard) -> ReportClient {
        let config = ApiConfig::new(server.url(), "t").unwrap();
        ReportClient::new(config, Arc::new(TracingReporter)).with_progress(false)
    }

    async fn mock_job(server: &mut mockito::ServerGuard, endpoint: &str, job: &str, status: Value) {
        server
            .mock("POST", format!("/api/{endpoint}").as_str())
            .match_query(Matcher::UrlEncoded("token".into(), "t".into()))
            .with_status(200)
            .with_body(json!({ "job": job }).to_string())
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/reports/status/{job}").as_str())
            .with_status(200)
            .with_body(status.to_string())
            .create_async()
            .await;
    }

    #[test]
    fn test_output_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            output_path(Some(dir.path()), Some("Tortoise")),
            dir.path()
                .join("Southeast Species Status Landscape Assessment Report - Tortoise.xlsx")
        );

        let file = dir.path().join("out.xlsx");
        assert_eq!(output_path(Some(&file), Some("Tortoise")), file);
        assert_eq!(
            output_path(None, None),
            PathBuf::from("Southeast Species Status Landscape Assessment Report.xlsx")
        );
    }

    #[test]
    fn test_report_result_requires_path() {
        let ok = report_result("report", json!("/api/reports/results/j"), vec![]).unwrap();
        assert_eq!(ok.result, "/api/reports/results/j");
        assert!(report_result("report", Value::Null, vec![]).is_err());
        assert!(report_result("report", json!(""), vec![]).is_err());
    }

    #[tokio::test]
    async fn test_run_uploads_reports_and_downloads() {
        let mut server = mockito::Server::new_async().await;
        mock_job(
            &mut server,
            "upload",
            "job-1",
            json!({
                "status": "success",
                "result": {
                    "uuid": "u-1",
                    "count": 2,
                    "fields": { "NAME": 2 },
                    "available_datasets": { "se_blueprint": true, "slr_depth": true, "urban": true },
                },
            }),
        )
        .await;

        let report_submit = server
            .mock("POST", "/api/report")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("se_blueprint,slr_depth".into()),
                Matcher::Regex(r#"name="field""#.into()),
            ]))
            .with_status(200)
            .with_body(json!({ "job": "job-2" }).to_string())
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/reports/status/job-2")
            .with_status(200)
            .with_body(
                json!({
                    "status": "success",
                    "result": "/api/reports/results/job-2",
                    "errors": ["slr_depth: no data"],
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/reports/results/job-2")
            .with_status(200)
            .with_body("xlsx bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("areas.zip");
        std::fs::write(&zip, b"PK\x03\x04").unwrap();

        let (path, warnings) = client(&server)
            .run(RunOptions {
                file: zip,
                field: Some("NAME".into()),
                exclude: vec!["urban".into()],
                name: Some("Tortoise".into()),
                output: Some(dir.path().to_path_buf()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            path,
            dir.path()
                .join("Southeast Species Status Landscape Assessment Report - Tortoise.xlsx")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "xlsx bytes");
        assert_eq!(warnings, vec!["slr_depth: no data".to_string()]);
        report_submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_attribute_before_report() {
        let mut server = mockito::Server::new_async().await;
        mock_job(
            &mut server,
            "upload",
            "job-1",
            json!({
                "status": "success",
                "result": { "uuid": "u-1", "count": 1, "available_datasets": { "urban": true } },
            }),
        )
        .await;
        let report_submit = server
            .mock("POST", "/api/report")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("areas.zip");
        std::fs::write(&zip, b"PK").unwrap();

        let err = client(&server)
            .run(RunOptions {
                file: zip,
                field: Some("COUNTY".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<ssa_report_core::RequestError>().is_some());
        report_submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_job_becomes_job_failed_error() {
        let mut server = mockito::Server::new_async().await;
        mock_job(
            &mut server,
            "reports/huc12/030902010101",
            "job-3",
            json!({ "status": "failed", "detail": "Unit not found" }),
        )
        .await;

        let err = client(&server)
            .summary(SummaryUnitType::Subwatershed, "030902010101")
            .await
            .unwrap_err();

        let failed = err.downcast_ref::<JobFailed>().unwrap();
        assert_eq!(failed.endpoint, "reports/huc12/030902010101");
        assert_eq!(failed.failure, JobFailure::Failed("Unit not found".into()));
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_existing_report_untouched() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/reports/results/job-4")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"partial spreadsheet")?;
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection dropped"))
            })
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        std::fs::write(&path, "previous report").unwrap();

        let result = client(&server)
            .download("/api/reports/results/job-4", None, Some(&path))
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous report");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1, "temporary file was not cleaned up");
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/reports/results/missing")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = client(&server)
            .download("/api/reports/results/missing", None, Some(dir.path()))
            .await;
        assert!(result.is_err());
    }
}
