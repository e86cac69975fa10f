//! Render error types.

use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Render service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Render not queued: {0}")]
    Rejected(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RenderError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}
