use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{ClientError, FailureKind, ProgressReport, SubmitSource};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to status queries and cleanup calls.
    pub request_timeout: Duration,
    /// Applies to submissions, which carry the whole file or wait for a download.
    pub upload_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// The three calls the lifecycle controller makes against the ingestion service.
#[async_trait::async_trait]
pub trait IngestClient: Send + Sync {
    /// Starts a job and returns the identifier the service assigned to it.
    async fn submit(&self, source: &SubmitSource) -> Result<String, ClientError>;

    async fn poll_status(&self, identifier: &str) -> Result<ProgressReport, ClientError>;

    /// Asks the service to stop work on `identifier` and delete partial artifacts.
    async fn cancel(&self, identifier: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Serialize)]
struct UrlRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    filename: String,
}

#[derive(Debug, Clone)]
pub struct ReqwestIngestClient {
    settings: ClientSettings,
    base: Url,
    http: reqwest::Client,
}

impl ReqwestIngestClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let base = Url::parse(settings.base_url.trim())
            .map_err(|err| ClientError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            http,
        })
    }

    /// Appends `segments` to the base url, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::new(FailureKind::InvalidUrl, "base url has no path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl IngestClient for ReqwestIngestClient {
    async fn submit(&self, source: &SubmitSource) -> Result<String, ClientError> {
        let request = match source {
            SubmitSource::LocalFile { name, bytes } => {
                let part = Part::stream_with_length(bytes.clone(), bytes.len() as u64)
                    .file_name(name.clone());
                self.http
                    .post(self.endpoint(&["upload"])?)
                    .multipart(Form::new().part("file", part))
            }
            SubmitSource::RemoteUrl(url) => self
                .http
                .post(self.endpoint(&["process_url"])?)
                .json(&UrlRequest { url: url.trim() }),
        };

        let response = request
            .timeout(self.settings.upload_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let body: SubmitResponse = response.json().await.map_err(map_reqwest_error)?;

        let identifier = body.filename.trim();
        if identifier.is_empty() {
            return Err(ClientError::new(
                FailureKind::Decode,
                "service returned an empty identifier",
            ));
        }
        Ok(identifier.to_string())
    }

    async fn poll_status(&self, identifier: &str) -> Result<ProgressReport, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["progress", identifier])?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        response.json().await.map_err(map_reqwest_error)
    }

    async fn cancel(&self, identifier: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["cancel", identifier])?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    match detail_message(&body) {
        Some(detail) => Err(ClientError::new(
            FailureKind::Rejected {
                status: status.as_u16(),
            },
            detail,
        )),
        None => Err(ClientError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        )),
    }
}

/// Extracts `{"detail": ...}` from an error body.
fn detail_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) => {
            Some(detail.trim()).filter(|d| !d.is_empty()).map(str::to_owned)
        }
        // Validation errors come back as structured detail.
        other => Some(other.to_string()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ClientError::new(FailureKind::Decode, err.to_string());
    }
    ClientError::new(FailureKind::Network, err.to_string())
}
