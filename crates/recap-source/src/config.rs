//! Content source configuration.

use std::time::Duration;

/// Content gateway configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the content gateway
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl SourceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SOURCE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            timeout: Duration::from_secs(
                std::env::var("SOURCE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
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
        std::env::set_var("SOURCE_BASE_URL", "http://gateway:9000");
        std::env::set_var("SOURCE_TIMEOUT", "5");

        let config = SourceConfig::from_env();
        assert_eq!(config.base_url, "http://gateway:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));

        std::env::remove_var("SOURCE_BASE_URL");
        std::env::remove_var("SOURCE_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_bad_timeout_falls_back() {
        std::env::set_var("SOURCE_TIMEOUT", "soon");
        assert_eq!(SourceConfig::from_env().timeout, Duration::from_secs(30));
        std::env::remove_var("SOURCE_TIMEOUT");
    }
}
