//! Summary types shared by the cache, the pipeline and the API.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sentinel the backends return when nothing is worth surfacing.
pub const NOTHING_INTERESTING: &str = "Nothing interesting";

/// Exact, case-sensitive sentinel check.
pub fn is_nothing_interesting(text: &str) -> bool {
    text == NOTHING_INTERESTING
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Media summary cache entry, keyed by media URL.
///
/// Persisted as `{"value": string, "addIt": bool, "clipLength"?: int}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedSummary {
    #[serde(rename = "value")]
    pub description: String,
    #[serde(rename = "addIt", default)]
    pub add_it: bool,
    #[serde(rename = "clipLength", default, skip_serializing_if = "is_zero")]
    pub clip_length: u32,
}

impl CachedSummary {
    pub fn new(description: impl Into<String>, add_it: bool, clip_length: u32) -> Self {
        Self {
            description: description.into(),
            add_it,
            clip_length,
        }
    }

    pub fn is_nothing_interesting(&self) -> bool {
        is_nothing_interesting(&self.description)
    }
}

/// One summary attributed to a subject.
///
/// Used both for per-item summaries fed back into prompts and for the
/// per-subject entries of the job output array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubjectSummary {
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Summarize")]
    pub summary: String,
}

impl SubjectSummary {
    pub fn new(author: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            summary: summary.into(),
        }
    }
}
