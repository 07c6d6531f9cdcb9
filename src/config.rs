use std::time::Duration;

use anyhow::{Context, Result};
use tracing::Level;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client configuration. Built once in `main` and handed to the backend client.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub timeout: Duration,
    pub log_level: Level,
    /// Default number of results for video search.
    pub max_results: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(120),
            log_level: Level::INFO,
            max_results: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_url = dotenv::var("STUDYBUDDY_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(defaults.api_url);

        let timeout = match dotenv::var("STUDYBUDDY_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid STUDYBUDDY_TIMEOUT_SECS: {}", raw))?,
            ),
            Err(_) => defaults.timeout,
        };

        let log_level = match dotenv::var("STUDYBUDDY_LOG_LEVEL") {
            Ok(raw) => raw
                .trim()
                .parse::<Level>()
                .map_err(|e| anyhow::anyhow!("Invalid STUDYBUDDY_LOG_LEVEL '{}': {}", raw, e))?,
            Err(_) => defaults.log_level,
        };

        let max_results = match dotenv::var("STUDYBUDDY_MAX_RESULTS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid STUDYBUDDY_MAX_RESULTS: {}", raw))?,
            Err(_) => defaults.max_results,
        };

        Ok(Self {
            api_url,
            timeout,
            log_level,
            max_results,
        })
    }

    /// Replace the base URL, e.g. from a command-line flag.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.api_url, "http://localhost:8000");
        assert_eq!(cfg.timeout, Duration::from_secs(120));
        assert_eq!(cfg.log_level, Level::INFO);
        assert_eq!(cfg.max_results, 3);
    }

    #[test]
    fn test_with_api_url_overrides() {
        let cfg = Config::default().with_api_url("http://backend:9000");
        assert_eq!(cfg.api_url, "http://backend:9000");
    }
}
