//! Subject feed types returned by the content source.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::MediaKind;

/// Profile flags of a subject that shape prompts and ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubjectProfile {
    pub username: String,
    /// Business account (prompts ask for business news/sales)
    #[serde(default)]
    pub is_business: bool,
    /// Subject follows the service account back
    #[serde(default)]
    pub followed_by: bool,
}

/// A media attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MediaRef {
    pub url: String,
}

/// Structured story annotations forwarded to prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoryMetadata {
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub polls: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub sliders: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// One story item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoryItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub videos: Vec<MediaRef>,
    /// Image versions, best first
    #[serde(default)]
    pub images: Vec<MediaRef>,
    #[serde(default)]
    pub metadata: StoryMetadata,
}

impl StoryItem {
    /// The single media processed for this item: first video, else first image.
    pub fn primary_media(&self) -> Option<(MediaKind, &str)> {
        if let Some(video) = self.videos.first() {
            return Some((MediaKind::Video, video.url.as_str()));
        }
        self.images
            .first()
            .map(|image| (MediaKind::Image, image.url.as_str()))
    }
}

/// A subject's profile and current stories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubjectFeed {
    pub profile: SubjectProfile,
    #[serde(default)]
    pub items: Vec<StoryItem>,
}
