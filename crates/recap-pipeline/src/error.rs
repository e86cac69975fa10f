//! Pipeline error types.

use thiserror::Error;

use recap_ai::AiError;
use recap_render::RenderError;
use recap_source::SourceError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Terminal message for failures with no more specific explanation.
pub const JOB_FAILED_MESSAGE: &str = "Failed to summarize stories";

#[derive(Debug, Error)]
pub enum PipelineError {
    /// No usable content-source session; the job cannot proceed
    #[error("Session unavailable: {0}")]
    SessionUnavailable(#[source] SourceError),

    /// The caller's stream is gone
    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Content source error: {0}")]
    Source(#[from] SourceError),

    #[error("Summarization error: {0}")]
    Ai(#[from] AiError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PipelineError {
    /// Errors that abort the job with an `error` terminal message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::SessionUnavailable(_) | PipelineError::Encode(_)
        )
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, PipelineError::ClientDisconnected)
    }

    /// Short message safe to show to the caller.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::SessionUnavailable(_) => "Failed to log in to the content source",
            PipelineError::ClientDisconnected => "Client disconnected",
            _ => JOB_FAILED_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let login = PipelineError::SessionUnavailable(SourceError::authentication_failed("nope"));
        assert!(login.is_fatal());
        assert!(!login.user_message().contains("nope"));

        assert!(PipelineError::ClientDisconnected.is_disconnected());
        assert!(!PipelineError::ClientDisconnected.is_fatal());
    }
}
