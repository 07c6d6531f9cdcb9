pub mod chat;
pub mod history;
pub mod quiz;
pub mod summarizer;
pub mod types;
pub mod youtube;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the study backend. The base URL comes from [`Config`].
pub struct BackendClient {
    client: reqwest::Client,
    /// Streaming answers can outlive the request timeout, so they get their own client.
    stream_client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        debug!(method = "GET", path, "backend request");
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("Failed to {}", what))?;
        read_json(resp, what).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, what: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method = "POST", path, "backend request");
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to {}", what))?;
        read_json(resp, what).await
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form, what: &str) -> Result<T> {
        debug!(method = "POST", path, "backend multipart request");
        let resp = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to {}", what))?;
        read_json(resp, what).await
    }
}

/// Fail on a non-success status, keeping the response body in the error.
async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        anyhow::bail!("Failed to {} ({})", what, status);
    }
    anyhow::bail!("Failed to {} ({}): {}", what, status, body)
}

async fn read_json<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    let resp = ensure_success(resp, what).await?;
    let text = resp
        .text()
        .await
        .with_context(|| format!("Failed to read response to {}", what))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse response to {}", what))
}

/// Multipart file part named after the file on disk.
async fn file_part(path: &Path, mime: &str) -> Result<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Part::bytes(bytes)
        .file_name(name)
        .mime_str(mime)
        .context("Invalid upload content type")
}

/// Guess an upload MIME type from the file extension.
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}
