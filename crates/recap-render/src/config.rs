//! Render configuration.

use std::time::Duration;

pub const DEFAULT_SOUNDTRACK_URL: &str =
    "https://shotstack-assets.s3-ap-southeast-2.amazonaws.com/music/freepd/advertising.mp3";

/// Render service configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub api_key: String,
    /// Base URL including the environment stage
    pub base_url: String,
    /// Interval between render status checks
    pub poll_interval: Duration,
    pub soundtrack_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.shotstack.io/edit/stage".to_string(),
            poll_interval: Duration::from_secs(25),
            soundtrack_url: DEFAULT_SOUNDTRACK_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("SHOTSTACK_API_KEY").unwrap_or_default(),
            base_url: std::env::var("SHOTSTACK_BASE_URL").unwrap_or(defaults.base_url),
            poll_interval: Duration::from_secs(
                std::env::var("RENDER_POLL_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(25),
            ),
            soundtrack_url: std::env::var("RENDER_SOUNDTRACK_URL").unwrap_or(defaults.soundtrack_url),
            timeout: defaults.timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
