//! Summarization backend error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("{backend} returned {status}: {body}")]
    Api {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("Media download failed: {0}")]
    DownloadFailed(String),

    #[error("Uploaded file has state {0}, not ACTIVE")]
    FileNotActive(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            AiError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let throttled = AiError::Api {
            backend: "openai",
            status: 429,
            body: String::new(),
        };
        let bad_request = AiError::Api {
            backend: "openai",
            status: 400,
            body: String::new(),
        };
        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!AiError::invalid_response("x").is_retryable());
    }
}
