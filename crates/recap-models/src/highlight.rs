//! Highlight assets collected for the recap video.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Media kind of a story attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest clip a single highlight may occupy, in seconds.
pub const MAX_CLIP_SECONDS: u32 = 60;

/// A media reference selected for the composed video.
///
/// Order of collection is timeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightAsset {
    /// Video or image
    pub kind: MediaKind,
    /// Source URL
    pub src: String,
    /// Clip length in seconds (0 drops the asset from the timeline)
    #[serde(default)]
    pub length: u32,
}

impl HighlightAsset {
    /// Lengths above [`MAX_CLIP_SECONDS`] are capped.
    pub fn new(kind: MediaKind, src: impl Into<String>, length: u32) -> Self {
        Self {
            kind,
            src: src.into(),
            length: length.min(MAX_CLIP_SECONDS),
        }
    }

    /// Whether the asset can occupy time on the timeline.
    pub fn is_playable(&self) -> bool {
        self.length > 0
    }
}
