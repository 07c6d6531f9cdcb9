use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::types::{SaveVideoRequest, SearchResponse, Video};
use super::{read_json, BackendClient};

pub const DEFAULT_MAX_RESULTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub max_results: u32,
    pub sort_by: Option<String>,
    pub include_shorts: bool,
    /// Ask the backend to filter results for study relevance.
    pub use_gemini_filter: Option<bool>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            sort_by: None,
            include_shorts: false,
            use_gemini_filter: None,
        }
    }
}

impl SearchOptions {
    fn query_pairs(&self, query: &str) -> Vec<(&'static str, String)> {
        let max_results = if self.max_results == 0 {
            DEFAULT_MAX_RESULTS
        } else {
            self.max_results
        };
        let mut pairs = vec![
            ("query", query.to_string()),
            ("max_results", max_results.to_string()),
        ];
        if let Some(sort_by) = self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("sort_by", sort_by.to_string()));
        }
        if self.include_shorts {
            pairs.push(("include_shorts", "true".to_string()));
        }
        if let Some(filter) = self.use_gemini_filter {
            pairs.push(("use_gemini_filter", filter.to_string()));
        }
        pairs
    }
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    detail: Option<Value>,
}

impl BackendClient {
    pub async fn search_videos(&self, query: &str, options: &SearchOptions) -> Result<Vec<Video>> {
        let query = query.trim();
        if query.is_empty() {
            bail!("Search query is empty");
        }

        debug!(method = "GET", path = "/youtube/search", query, "backend request");
        let resp = self
            .client
            .get(self.url("/youtube/search"))
            .query(&options.query_pairs(query))
            .send()
            .await
            .context("Failed to fetch videos")?;

        let status = resp.status();
        if !status.is_success() {
            // The backend explains failures in a JSON `detail` field.
            let detail = match resp.json::<ErrorDetail>().await {
                Ok(body) => body.detail.map(|d| match d {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
                Err(_) => Some("Unknown error".to_string()),
            };
            let detail = detail
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Failed to fetch videos".to_string());
            return Err(anyhow!(detail).context(format!("Video search failed ({})", status)));
        }

        let body: SearchResponse = read_json(resp, "fetch videos").await?;
        info!(query, results = body.videos.len(), "video search finished");
        Ok(body.videos)
    }

    /// Save a search result to the user's video history.
    pub async fn save_video(&self, video: &Video) -> Result<Value> {
        let Some(video_id) = video.video_id.clone() else {
            bail!("Video '{}' has no id", video.title);
        };
        let body = SaveVideoRequest {
            video_id,
            title: video.title.clone(),
            channel: video.channel_title.clone(),
            published_at: video.published_at.clone(),
            thumbnail: video
                .thumbnails
                .as_ref()
                .and_then(|t| t.medium.as_ref())
                .map(|t| t.url.clone()),
        };
        self.post_json("/youtube/save", &body, "save video").await
    }
}
