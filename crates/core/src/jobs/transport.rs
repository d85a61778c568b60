// crates/core/src/jobs/transport.rs
//! HTTP seam between the polling loop and the job server.

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;

use super::payload::JobPayload;
use crate::config::ApiConfig;
use crate::error::JobError;

/// Raw HTTP response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Result of one status request.
///
/// A network failure is an expected, countable event for the polling loop,
/// so it is a value here rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAttempt {
    Reply(HttpReply),
    NetworkError(String),
}

/// Transport used by [`JobSubmission`](super::JobSubmission).
///
/// Implementations:
/// - `HttpTransport`: reqwest against the report API
/// - scripted transports in tests
#[async_trait]
pub trait JobTransport: Send + Sync {
    /// POST `payload` as multipart form data to the job endpoint `endpoint`
    /// (relative to `/api/`). Failing to reach the server is fatal here.
    async fn submit(&self, endpoint: &str, payload: JobPayload) -> Result<HttpReply, JobError>;

    /// GET the status path (relative to `/api/`) with caching disabled.
    async fn poll(&self, status_path: &str) -> PollAttempt;
}

/// reqwest-backed transport for the report API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    api_host: String,
    api_token: String,
}

impl HttpTransport {
    pub fn new(api_host: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_host, api_token)
    }

    pub fn with_client(client: Client, api_host: impl Into<String>, api_token: impl Into<String>) -> Self {
        let api_host: String = api_host.into();
        Self {
            client,
            api_host: api_host.trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.api_host.clone(), config.api_token.clone())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.api_host, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl JobTransport for HttpTransport {
    async fn submit(&self, endpoint: &str, payload: JobPayload) -> Result<HttpReply, JobError> {
        let url = self.api_url(endpoint);
        let form = payload.into_form()?;

        let response = self
            .client
            .post(&url)
            .query(&[("token", self.api_token.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|source| JobError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| JobError::Request { url, source })?;

        Ok(HttpReply { status, body })
    }

    async fn poll(&self, status_path: &str) -> PollAttempt {
        let url = self.api_url(status_path);

        let response = match self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return PollAttempt::NetworkError(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => PollAttempt::Reply(HttpReply { status, body }),
            Err(e) => PollAttempt::NetworkError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_cleanly() {
        let transport = HttpTransport::new("https://ssa.example.org/", "token");
        assert_eq!(transport.api_url("upload"), "https://ssa.example.org/api/upload");
        assert_eq!(
            transport.api_url("/reports/status/abc"),
            "https://ssa.example.org/api/reports/status/abc"
        );
    }

    #[tokio::test]
    async fn test_poll_unreachable_host_is_network_error() {
        // Grab a free port, then release it so nothing is listening.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let transport = HttpTransport::new(format!("http://{addr}"), "token");
        let attempt = transport.poll("reports/status/abc").await;
        assert!(matches!(attempt, PollAttempt::NetworkError(_)));
    }
}
