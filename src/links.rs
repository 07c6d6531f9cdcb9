//! YouTube and generic link helpers.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Url;

const WATCH_URL: &str = "https://www.youtube.com/watch";

const YOUTUBE_DOMAINS: [&str; 2] = [
    r"^https?://(www\.)?(youtube\.com|youtu\.be)/.+",
    r"^https?://m\.youtube\.com/.+",
];

const VIDEO_ID_PATTERNS: [&str; 2] = [
    r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)",
    r"youtube\.com/watch\?.*v=([^&\n?#]+)",
];

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn youtube_domains() -> &'static [Regex] {
    static DOMAINS: OnceLock<Vec<Regex>> = OnceLock::new();
    DOMAINS.get_or_init(|| compile_all(&YOUTUBE_DOMAINS))
}

fn video_id_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile_all(&VIDEO_ID_PATTERNS))
}

/// Video id from a watch, short or embed link.
pub fn extract_video_id(url: &str) -> Option<String> {
    for re in video_id_patterns() {
        if let Some(caps) = re.captures(url) {
            let id = caps.get(1)?.as_str();
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

/// True for a YouTube link that names a video.
pub fn is_valid_youtube_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    let on_youtube = youtube_domains().iter().any(|re| re.is_match(url));
    on_youtube && extract_video_id(url).is_some()
}

/// True for any absolute http(s) URL.
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url.trim())
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Full watch URL for a bare video id. Anything that already looks like a link passes through.
pub fn watch_url(id_or_url: &str) -> Result<String> {
    if id_or_url.starts_with("http") {
        return Ok(id_or_url.to_string());
    }
    let url = Url::parse_with_params(WATCH_URL, &[("v", id_or_url)])
        .with_context(|| format!("Invalid video id '{}'", id_or_url))?;
    Ok(url.into())
}
