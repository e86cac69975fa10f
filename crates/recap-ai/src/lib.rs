//! Summarization backends.
//!
//! - [`GeminiClient`] describes videos (download, upload to the file API,
//!   wait for processing, generate)
//! - [`OpenAiClient`] describes images and folds many summaries into one

pub mod backend;
pub mod config;
pub mod error;
pub mod gemini;
pub mod openai;
mod response;

pub use backend::{FoldRequest, MediaSummarizer, MediaSummary, SummaryFolder};
pub use config::AiConfig;
pub use error::{AiError, AiResult};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
