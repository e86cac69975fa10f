//! Render timeline construction.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use recap_models::HighlightAsset;

const OUTPUT_FORMAT: &str = "mp4";
const OUTPUT_WIDTH: u32 = 720;
const OUTPUT_HEIGHT: u32 = 1280;
const SOUNDTRACK_EFFECT: &str = "fadeInFadeOut";
const FADE: &str = "fade";

/// Motion effect applied to a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Effect {
    ZoomIn,
    SlideUp,
    SlideLeft,
    ZoomOut,
    SlideDown,
    SlideRight,
}

impl Effect {
    pub const ALL: [Effect; 6] = [
        Effect::ZoomIn,
        Effect::SlideUp,
        Effect::SlideLeft,
        Effect::ZoomOut,
        Effect::SlideDown,
        Effect::SlideRight,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub timeline: Timeline,
    pub output: Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub soundtrack: Soundtrack,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soundtrack {
    pub src: String,
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub clips: Vec<Clip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub asset: ClipAsset,
    /// Seconds from the start of the video
    pub start: u32,
    pub length: u32,
    pub effect: Effect,
    pub transition: Transition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipAsset {
    #[serde(rename = "type")]
    pub kind: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<String>,
    #[serde(rename = "out")]
    pub fade_out: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub format: String,
    pub size: Size,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl RenderRequest {
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.timeline.tracks.iter().flat_map(|t| t.clips.iter())
    }
}

/// Build a timeline using the thread-local RNG for effects.
pub fn build_timeline(assets: &[HighlightAsset], soundtrack_url: &str) -> Option<RenderRequest> {
    build_timeline_with_rng(assets, soundtrack_url, &mut rand::rng())
}

/// Build a single-track timeline from highlight assets.
///
/// Assets keep their order; zero-length assets are dropped. The first kept
/// clip fades in and out, the others fade out. Each clip starts one second
/// before the previous one ends. Returns `None` when no clip survives.
pub fn build_timeline_with_rng<R: Rng + ?Sized>(
    assets: &[HighlightAsset],
    soundtrack_url: &str,
    rng: &mut R,
) -> Option<RenderRequest> {
    let mut clips = Vec::new();
    let mut start = 0u32;

    for asset in assets.iter().filter(|a| a.is_playable()) {
        let transition = if clips.is_empty() {
            Transition {
                fade_in: Some(FADE.to_string()),
                fade_out: FADE.to_string(),
            }
        } else {
            Transition {
                fade_in: None,
                fade_out: FADE.to_string(),
            }
        };

        clips.push(Clip {
            asset: ClipAsset {
                kind: asset.kind.as_str().to_string(),
                src: asset.src.clone(),
            },
            start,
            length: asset.length,
            effect: *Effect::ALL.choose(rng).unwrap_or(&Effect::ZoomIn),
            transition,
        });

        start = start.saturating_add(asset.length - 1);
    }

    if clips.is_empty() {
        return None;
    }

    Some(RenderRequest {
        timeline: Timeline {
            soundtrack: Soundtrack {
                src: soundtrack_url.to_string(),
                effect: SOUNDTRACK_EFFECT.to_string(),
            },
            tracks: vec![Track { clips }],
        },
        output: Output {
            format: OUTPUT_FORMAT.to_string(),
            size: Size {
                width: OUTPUT_WIDTH,
                height: OUTPUT_HEIGHT,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use recap_models::MediaKind;

    fn assets() -> Vec<HighlightAsset> {
        vec![
            HighlightAsset::new(MediaKind::Image, "https://cdn/zero.jpg", 0),
            HighlightAsset::new(MediaKind::Video, "https://cdn/a.mp4", 5),
            HighlightAsset::new(MediaKind::Image, "https://cdn/b.jpg", 3),
            HighlightAsset::new(MediaKind::Video, "https://cdn/c.mp4", 4),
        ]
    }

    #[test]
    fn test_timeline_layout() {
        let request =
            build_timeline_with_rng(&assets(), "https://music/x.mp3", &mut StdRng::seed_from_u64(7))
                .unwrap();
        let clips: Vec<_> = request.clips().collect();

        assert_eq!(clips.len(), 3);
        assert_eq!(clips[0].asset.src, "https://cdn/a.mp4");
        assert_eq!(clips[0].asset.kind, "video");
        assert_eq!(
            clips.iter().map(|c| c.start).collect::<Vec<_>>(),
            vec![0, 4, 6]
        );
        assert_eq!(clips[0].transition.fade_in.as_deref(), Some("fade"));
        assert!(clips[1..].iter().all(|c| c.transition.fade_in.is_none()));
        assert!(clips.iter().all(|c| c.transition.fade_out == "fade"));
        assert!(clips.iter().all(|c| Effect::ALL.contains(&c.effect)));
    }

    #[test]
    fn test_huge_lengths_do_not_overflow() {
        // Deserialized assets bypass the length cap
        let huge = |src: &str, length| HighlightAsset {
            kind: MediaKind::Video,
            src: src.to_string(),
            length,
        };
        let assets = vec![
            huge("https://cdn/a.mp4", 3_000_000_000),
            huge("https://cdn/b.mp4", 3_000_000_000),
            huge("https://cdn/c.mp4", 5),
        ];
        let request =
            build_timeline_with_rng(&assets, "https://music/x.mp3", &mut StdRng::seed_from_u64(1))
                .unwrap();
        let starts: Vec<_> = request.clips().map(|c| c.start).collect();

        assert_eq!(starts, vec![0, 2_999_999_999, u32::MAX]);
    }

    #[test]
    fn test_empty_timeline() {
        let zero = vec![HighlightAsset::new(MediaKind::Image, "https://cdn/z.jpg", 0)];
        assert!(build_timeline(&zero, "https://music/x.mp3").is_none());
        assert!(build_timeline(&[], "https://music/x.mp3").is_none());
    }

    #[test]
    fn test_wire_format() {
        let request = build_timeline(&assets()[1..2], "https://music/x.mp3").unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["output"]["format"], "mp4");
        assert_eq!(json["output"]["size"]["width"], 720);
        assert_eq!(json["output"]["size"]["height"], 1280);
        assert_eq!(json["timeline"]["soundtrack"]["effect"], "fadeInFadeOut");

        let clip = &json["timeline"]["tracks"][0]["clips"][0];
        assert_eq!(clip["asset"]["type"], "video");
        assert_eq!(clip["transition"]["in"], "fade");
        assert!(clip["effect"].as_str().unwrap().chars().next().unwrap().is_lowercase());
    }

    #[test]
    fn test_later_clip_omits_fade_in() {
        let request = build_timeline(&assets(), "https://music/x.mp3").unwrap();
        let json = serde_json::to_value(&request).unwrap();
        let second = &json["timeline"]["tracks"][0]["clips"][1]["transition"];
        assert!(second.get("in").is_none());
    }
}
