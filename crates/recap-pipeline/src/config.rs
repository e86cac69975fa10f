//! Pipeline configuration.

use std::time::Duration;

use recap_render::RenderConfig;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Service account used with the content source
    pub login: String,
    pub password: String,
    /// Lifetime of cached media summaries
    pub summary_ttl: Duration,
    /// Lifetime of persisted subject history
    pub history_ttl: Duration,
    /// Interval between render status checks
    pub render_poll_interval: Duration,
    pub soundtrack_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let render = RenderConfig::default();
        Self {
            login: String::new(),
            password: String::new(),
            summary_ttl: Duration::from_secs(24 * 3600),
            history_ttl: Duration::from_secs(7 * 24 * 3600),
            render_poll_interval: render.poll_interval,
            soundtrack_url: render.soundtrack_url,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let render = RenderConfig::from_env();
        Self {
            login: std::env::var("DEFAULT_LOGIN").unwrap_or_default(),
            password: std::env::var("DEFAULT_PASSWORD").unwrap_or_default(),
            summary_ttl: Duration::from_secs(
                std::env::var("SUMMARY_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24 * 3600),
            ),
            history_ttl: Duration::from_secs(
                std::env::var("HISTORY_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(7 * 24 * 3600),
            ),
            render_poll_interval: render.poll_interval,
            soundtrack_url: render.soundtrack_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("DEFAULT_LOGIN", "svc");
        std::env::set_var("DEFAULT_PASSWORD", "pw");
        std::env::remove_var("SUMMARY_TTL_SECS");
        std::env::set_var("RENDER_POLL_INTERVAL", "2");

        let config = PipelineConfig::from_env();
        assert_eq!(config.login, "svc");
        assert_eq!(config.summary_ttl, Duration::from_secs(86_400));
        assert_eq!(config.history_ttl, Duration::from_secs(604_800));
        assert_eq!(config.render_poll_interval, Duration::from_secs(2));

        std::env::remove_var("DEFAULT_LOGIN");
        std::env::remove_var("DEFAULT_PASSWORD");
        std::env::remove_var("RENDER_POLL_INTERVAL");
    }
}
