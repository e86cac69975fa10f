//! Shared data models for the story recap service.
//!
//! This crate provides Serde-serializable types for:
//! - Batch jobs and their lifecycle states
//! - Subject stories and media references
//! - Rolling per-subject history
//! - Cached media summaries and highlight assets
//! - Streamed WebSocket message schemas

pub mod highlight;
pub mod history;
pub mod job;
pub mod story;
pub mod stream;
pub mod summary;

// Re-export common types
pub use highlight::{HighlightAsset, MediaKind, MAX_CLIP_SECONDS};
pub use history::{SubjectHistory, HISTORY_DATE_FORMAT, MAX_HISTORY_ENTRIES};
pub use job::{BatchJob, JobId, JobState, RejectionReason};
pub use story::{MediaRef, StoryItem, StoryMetadata, SubjectFeed, SubjectProfile};
pub use stream::{StreamMessage, StreamMessageType, SummarizeRequest};
pub use summary::{is_nothing_interesting, CachedSummary, SubjectSummary, NOTHING_INTERESTING};
