use std::path::Path;

use anyhow::Result;
use reqwest::multipart::Form;
use tracing::info;

use super::types::{SummarizeResponse, Summary};
use super::{file_part, mime_for, BackendClient};
use crate::links;

impl BackendClient {
    /// Summarize a local lecture recording.
    pub async fn upload_video(&self, path: &Path) -> Result<Summary> {
        let form = Form::new().part("file", file_part(path, mime_for(path)).await?);
        let resp: SummarizeResponse = self
            .post_form("/summarizer/upload", form, "summarize video")
            .await?;
        info!(file = %path.display(), "video summarized");
        Ok(resp.result)
    }

    pub async fn summarize_youtube(&self, url: &str) -> Result<Summary> {
        let form = Form::new().text("url", url.to_string());
        let resp: SummarizeResponse = self
            .post_form("/summarizer/youtube", form, "summarize video")
            .await?;
        info!(url, "video summarized");
        Ok(resp.result)
    }

    /// Accepts either a bare video id or a full link.
    pub async fn summarize_youtube_by_id(&self, id_or_url: &str) -> Result<Summary> {
        let url = links::watch_url(id_or_url)?;
        self.summarize_youtube(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::client_for;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summary_body() -> serde_json::Value {
        json!({"result": {
            "summary": "Projectile motion",
            "key_points": ["Horizontal velocity is constant"],
            "formulas": ["R = u^2 sin(2θ) / g"]
        }})
    }

    #[tokio::test]
    async fn test_summarize_by_id_builds_watch_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarizer/youtube"))
            .and(body_string_contains("https://www.youtube.com/watch?v=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(summary_body()))
            .mount(&server)
            .await;

        let summary = client_for(&server)
            .summarize_youtube_by_id("abc123")
            .await
            .unwrap();
        assert_eq!(summary.summary, "Projectile motion");
        assert_eq!(summary.key_points.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarizer/upload"))
            .and(body_string_contains("video/mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(summary_body()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("lecture.mp4");
        std::fs::File::create(&video)
            .unwrap()
            .write_all(b"\x00\x00\x00\x18ftypmp42")
            .unwrap();

        let summary = client_for(&server).upload_video(&video).await.unwrap();
        assert_eq!(summary.formulas.len(), 1);
    }

    #[tokio::test]
    async fn test_summarize_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarizer/youtube"))
            .respond_with(ResponseTemplate::new(422).set_body_string("transcript unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .summarize_youtube("https://youtu.be/x")
            .await
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Failed to summarize video"));
        assert!(msg.contains("transcript unavailable"));
    }
}
