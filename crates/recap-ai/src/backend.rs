//! Backend traits and their request/response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use recap_models::SubjectSummary;

use crate::error::AiResult;

/// Structured description of one media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub description: String,
    /// Worth including in the recap video
    #[serde(rename = "addIt", default)]
    pub add_it: bool,
    /// Suggested clip length in seconds
    #[serde(default)]
    pub clip_length: u32,
}

/// Describes the media at a URL, guided by a prompt.
#[async_trait]
pub trait MediaSummarizer: Send + Sync {
    async fn summarize(&self, url: &str, prompt: &str) -> AiResult<MediaSummary>;
}

/// Input to a fold: one subject's accumulated summaries.
#[derive(Debug, Clone)]
pub struct FoldRequest {
    pub summaries: Vec<SubjectSummary>,
    pub is_business: bool,
    pub preferences: String,
}

/// Folds many summaries into one short text (or the sentinel).
#[async_trait]
pub trait SummaryFolder: Send + Sync {
    async fn fold(&self, request: &FoldRequest) -> AiResult<String>;
}
