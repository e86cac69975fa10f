//! Streamed message types for the summarize call.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stream message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StreamMessageType {
    Queued,
    Progress,
    Result,
    Rejected,
    Error,
}

impl StreamMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamMessageType::Queued => "queued",
            StreamMessageType::Progress => "progress",
            StreamMessageType::Result => "result",
            StreamMessageType::Rejected => "rejected",
            StreamMessageType::Error => "error",
        }
    }
}

/// Message envelope pushed to the caller.
///
/// A stream carries any number of `Queued`/`Progress` messages followed by
/// exactly one terminal message (`Result`, `Rejected` or `Error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Job accepted and waiting behind `ahead` other jobs
    Queued { ahead: usize },

    /// Incremental progress text
    Progress {
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// Final result
    Result {
        /// JSON-encoded array of per-subject summaries
        #[serde(rename = "resultText")]
        result_text: String,
        /// Composed video URL, empty when none was produced
        #[serde(rename = "videoLink")]
        video_link: String,
        /// Paid backend calls consumed by the job
        #[serde(rename = "budgetUsed")]
        budget_used: f64,
    },

    /// Request refused before queuing
    Rejected { message: String },

    /// Job aborted by a fatal error
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl StreamMessage {
    pub fn queued(ahead: usize) -> Self {
        StreamMessage::Queued { ahead }
    }

    pub fn progress(text: impl Into<String>) -> Self {
        StreamMessage::Progress {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn result(result_text: impl Into<String>, video_link: impl Into<String>, budget_used: u32) -> Self {
        StreamMessage::Result {
            result_text: result_text.into(),
            video_link: video_link.into(),
            budget_used: f64::from(budget_used),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        StreamMessage::Rejected {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamMessage::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn message_type(&self) -> StreamMessageType {
        match self {
            StreamMessage::Queued { .. } => StreamMessageType::Queued,
            StreamMessage::Progress { .. } => StreamMessageType::Progress,
            StreamMessage::Result { .. } => StreamMessageType::Result,
            StreamMessage::Rejected { .. } => StreamMessageType::Rejected,
            StreamMessage::Error { .. } => StreamMessageType::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamMessage::Result { .. } | StreamMessage::Rejected { .. } | StreamMessage::Error { .. }
        )
    }
}

/// Batch summarize request (first client frame).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SummarizeRequest {
    /// Subjects to analyze, in order
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Compose a recap video from the highlights
    #[serde(rename = "isDaily", default)]
    pub is_daily: bool,
    /// Caller preferences for the fold step
    #[serde(default)]
    pub preferences: String,
    /// Remaining paid backend calls
    #[serde(rename = "remainingBudget", default)]
    pub remaining_budget: f64,
}
