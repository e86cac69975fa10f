//! Decoding of model text output.

use crate::backend::MediaSummary;
use crate::error::{AiError, AiResult};

/// Strip a surrounding markdown code fence, if any.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

pub(crate) fn decode_media_summary(text: &str) -> AiResult<MediaSummary> {
    serde_json::from_str(strip_code_fences(text))
        .map_err(|e| AiError::invalid_response(format!("media summary JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_decode_media_summary() {
        let summary = decode_media_summary(
            "```json\n{\"description\":\"Surfing\",\"addIt\":true,\"clip_length\":4}\n```",
        )
        .unwrap();
        assert_eq!(summary.description, "Surfing");
        assert!(summary.add_it);
        assert_eq!(summary.clip_length, 4);

        let image = decode_media_summary("{\"description\":\"Coffee\"}").unwrap();
        assert!(!image.add_it);
        assert_eq!(image.clip_length, 0);
    }

    #[test]
    fn test_missing_description_is_error() {
        assert!(decode_media_summary("{\"addIt\":true}").is_err());
        assert!(decode_media_summary("Sorry, I can't help").is_err());
    }
}
