//! Poller configuration from the environment.

use std::time::Duration;

use medcal_core::{defaults, Result};

use crate::http::HttpClient;
use crate::tracker::TrackOptions;

/// Default base URL of the medcal API.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub http_max_attempts: usize,
    pub http_base_backoff_ms: u64,
    pub http_timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            http_max_attempts: defaults::HTTP_MAX_ATTEMPTS,
            http_base_backoff_ms: defaults::HTTP_BASE_BACKOFF_MS,
            http_timeout_secs: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl PollerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `MEDCAL_API_URL` | `http://127.0.0.1:3000` |
    /// | `POLL_INTERVAL_MS` | `500` |
    /// | `HTTP_MAX_ATTEMPTS` | `3` |
    /// | `HTTP_BASE_BACKOFF_MS` | `200` |
    /// | `HTTP_TIMEOUT_SECS` | `30` |
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            api_url: std::env::var("MEDCAL_API_URL").unwrap_or(base.api_url),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS").unwrap_or(base.poll_interval_ms),
            http_max_attempts: env_parse::<usize>("HTTP_MAX_ATTEMPTS")
                .unwrap_or(base.http_max_attempts)
                .max(1),
            http_base_backoff_ms: env_parse("HTTP_BASE_BACKOFF_MS")
                .unwrap_or(base.http_base_backoff_ms),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS").unwrap_or(base.http_timeout_secs),
        }
    }

    /// Build an HTTP client with these transport settings.
    pub fn http_client(&self) -> Result<HttpClient> {
        HttpClient::builder(&self.api_url)
            .max_attempts(self.http_max_attempts)
            .base_backoff(Duration::from_millis(self.http_base_backoff_ms))
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
    }

    /// Tracking options with this poll interval and no callbacks.
    pub fn track_options(&self) -> TrackOptions {
        TrackOptions::default().poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.http_max_attempts, 3);
        assert_eq!(config.http_base_backoff_ms, 200);
        assert_eq!(
            config.track_options().poll_interval,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_http_client_builds() {
        assert!(PollerConfig::default().http_client().is_ok());
    }
}
