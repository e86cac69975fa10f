//! Backend configuration.

use std::time::Duration;

/// Summarization backend configuration.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub gemini_api_key: String,
    /// Models tried in order until one succeeds
    pub gemini_models: Vec<String>,
    pub gemini_base_url: String,
    /// Interval between file state checks while Gemini processes an upload
    pub file_poll_interval: Duration,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-flash-lite".to_string(),
                "gemini-2.0-flash".to_string(),
            ],
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            file_poll_interval: Duration::from_secs(5),
            openai_api_key: String::new(),
            openai_model: "gpt-4o".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl AiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let gemini_models = std::env::var("GEMINI_MODELS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or(defaults.gemini_models);

        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_models,
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            file_poll_interval: Duration::from_secs(
                std::env::var("GEMINI_FILE_POLL_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            timeout: Duration::from_secs(
                std::env::var("AI_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
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
    fn test_model_list_from_env() {
        std::env::set_var("GEMINI_MODELS", "gemini-a, ,gemini-b");
        assert_eq!(AiConfig::from_env().gemini_models, vec!["gemini-a", "gemini-b"]);

        std::env::set_var("GEMINI_MODELS", " , ");
        assert_eq!(AiConfig::from_env().gemini_models.len(), 3);

        std::env::remove_var("GEMINI_MODELS");
    }

    #[test]
    #[serial]
    fn test_openai_defaults() {
        std::env::remove_var("OPENAI_MODEL");
        std::env::remove_var("OPENAI_BASE_URL");
        let config = AiConfig::from_env();
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.openai_base_url, "https://api.openai.com");
    }
}
