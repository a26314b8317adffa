//! Output-format suffixes.
//!
//! Features whose downstream consumer parses the reply get a fixed
//! instruction block appended to the user prompt. This is a static lookup
//! keyed by feature type and operating mode, not templated text.

use inkflow_core::feature::FeatureType;
use serde::{Deserialize, Serialize};

/// How the downstream consumer wants the model's reply shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Bare prose, no headers or markup.
    Prose,
    /// Strict JSON matching the feature's schema.
    Json,
    /// Titled options parsed by the streaming extractor.
    Structured,
}

impl OutputMode {
    /// The default operating mode for a feature.
    pub fn default_for(feature: FeatureType) -> Self {
        match feature {
            FeatureType::OutlineGeneration => Self::Structured,
            FeatureType::SceneGeneration => Self::Prose,
            _ => Self::Prose,
        }
    }
}

impl std::str::FromStr for OutputMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prose" => Ok(Self::Prose),
            "json" => Ok(Self::Json),
            "structured" => Ok(Self::Structured),
            _ => Err(()),
        }
    }
}

const OUTLINE_STRUCTURED_SUFFIX: &str = "\n\nFormat your reply exactly as:\n\
TITLE: <a short title for this outline option>\n\
CONTENT: <the outline itself>\n\
Do not add any other headers or commentary.";

const OUTLINE_JSON_SUFFIX: &str = "\n\nReply with strict JSON only, no prose outside the object:\n\
{\"title\": \"<short title>\", \"content\": \"<the outline>\"}";

const SCENE_PROSE_SUFFIX: &str = "\n\nWrite the scene as bare prose. \
No headers, no scene numbers, no commentary before or after.";

/// The fixed instruction block for a feature/mode pair, if one applies.
pub fn output_format_suffix(feature: FeatureType, mode: OutputMode) -> Option<&'static str> {
    match (feature, mode) {
        (FeatureType::OutlineGeneration, OutputMode::Structured) => {
            Some(OUTLINE_STRUCTURED_SUFFIX)
        }
        (FeatureType::OutlineGeneration, OutputMode::Json) => Some(OUTLINE_JSON_SUFFIX),
        (FeatureType::SceneGeneration, OutputMode::Prose) => Some(SCENE_PROSE_SUFFIX),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn outline_default_is_structured() {
        assert_eq!(
            OutputMode::default_for(FeatureType::OutlineGeneration),
            OutputMode::Structured
        );
        assert_eq!(
            OutputMode::default_for(FeatureType::Chat),
            OutputMode::Prose
        );
    }

    #[test]
    fn structured_suffix_names_both_markers() {
        let suffix =
            output_format_suffix(FeatureType::OutlineGeneration, OutputMode::Structured).unwrap();
        assert!(suffix.contains("TITLE:"));
        assert!(suffix.contains("CONTENT:"));
    }

    #[test]
    fn chat_has_no_suffix() {
        assert!(output_format_suffix(FeatureType::Chat, OutputMode::Prose).is_none());
        assert!(output_format_suffix(FeatureType::Summary, OutputMode::Json).is_none());
    }

    #[test]
    fn mode_parses() {
        assert_eq!(OutputMode::from_str("json"), Ok(OutputMode::Json));
        assert!(OutputMode::from_str("interpretive_dance").is_err());
    }
}
