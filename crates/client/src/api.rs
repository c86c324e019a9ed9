//! REST API client for the Folio HTTP endpoints.
//!
//! Wraps job submission, status, cancellation, report polling and the
//! outline and podcast scripts using [`reqwest`]. Every success body is
//! unwrapped from the server's `{ "data": ... }` envelope.

use async_trait::async_trait;
use folio_core::jobs::{JobAccepted, SourceDocument};
use folio_core::polling::ReportSource;
use folio_core::reports::ReportPoll;
use folio_core::run_state::RunState;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// HTTP client for a single Folio server.
#[derive(Debug, Clone)]
pub struct FolioClient {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the Folio REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Folio API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ClientError {
    /// The server's machine-readable error code, if the body carried one.
    pub fn code(&self) -> Option<String> {
        match self {
            ClientError::ApiError { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("code")?
                .as_str()
                .map(str::to_string),
            ClientError::Request(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CancelResult {
    cancelled: bool,
}

#[derive(Debug, Deserialize)]
struct PodcastResult {
    audio_url: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub job_running: bool,
}

impl FolioClient {
    /// Create a new client.
    ///
    /// * `base_url` - Server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`. Not enveloped.
    pub async fn health(&self) -> Result<Health, ClientError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    /// Submit a job: the task description plus its documents.
    ///
    /// Any job already running on the server is terminated first.
    pub async fn submit_job(
        &self,
        selected_text: &str,
        documents: &[SourceDocument],
    ) -> Result<JobAccepted, ClientError> {
        let mut form =
            reqwest::multipart::Form::new().text("selected_text", selected_text.to_string());
        for doc in documents {
            let part = reqwest::multipart::Part::bytes(doc.content.clone())
                .file_name(doc.file_name.clone())
                .mime_str("application/pdf")?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(self.api("/jobs"))
            .multipart(form)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    pub async fn current_job(&self) -> Result<RunState, ClientError> {
        let response = self.client.get(self.api("/jobs/current")).send().await?;
        Self::parse_data(response).await
    }

    /// Cancel the running job. Returns whether one was running.
    pub async fn cancel_job(&self) -> Result<bool, ClientError> {
        let response = self
            .client
            .post(self.api("/jobs/current/cancel"))
            .send()
            .await?;
        let result: CancelResult = Self::parse_data(response).await?;
        Ok(result.cancelled)
    }

    /// Reports written since `known`, plus the run status.
    pub async fn poll_reports(&self, known: &[String]) -> Result<ReportPoll, ClientError> {
        let mut request = self.client.get(self.api("/reports"));
        if !known.is_empty() {
            request = request.query(&[("known", known.join(","))]);
        }
        Self::parse_data(request.send().await?).await
    }

    /// A stored outline by file name.
    pub async fn outline(&self, file_name: &str) -> Result<serde_json::Value, ClientError> {
        let response = self
            .client
            .get(self.api(&format!("/outlines/{file_name}")))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// Upload one document and wait for its outline.
    ///
    /// Returns the server's `{file_name, url, outline}` object.
    pub async fn extract_outline(
        &self,
        document: &SourceDocument,
    ) -> Result<serde_json::Value, ClientError> {
        let part = reqwest::multipart::Part::bytes(document.content.clone())
            .file_name(document.file_name.clone())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.api("/outlines"))
            .multipart(form)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// Synthesize a podcast for `text`. Returns the audio URL.
    pub async fn create_podcast(&self, text: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.api("/podcasts"))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;
        let result: PodcastResult = Self::parse_data(response).await?;
        Ok(result.audio_url)
    }

    // ---- private helpers ----

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ClientError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Check the status, then unwrap the `data` envelope.
    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        let envelope: DataEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ReportSource for FolioClient {
    type Error = ClientError;

    async fn poll_reports(&self, known: &[String]) -> Result<ReportPoll, ClientError> {
        FolioClient::poll_reports(self, known).await
    }
}
