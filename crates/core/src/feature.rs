//! The AI feature enumeration.
//!
//! A `FeatureType` drives template resolution, output-format suffixes,
//! public-config gating, and the billing estimation multiplier. Unknown
//! feature names are rejected before any provider call.

use crate::error::PromptError;
use serde::{Deserialize, Serialize};

/// An AI capability exposed by the writing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Free-form conversation with the assistant.
    Chat,
    /// Expand a passage into longer prose.
    Expansion,
    /// Condense a passage or chapter.
    Summary,
    /// Line-level rewrite without changing meaning.
    Polish,
    /// Generate a full scene from a beat or outline.
    SceneGeneration,
    /// Generate N alternative outline options in parallel.
    OutlineGeneration,
}

impl FeatureType {
    /// Canonical string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Expansion => "expansion",
            Self::Summary => "summary",
            Self::Polish => "polish",
            Self::SceneGeneration => "scene_generation",
            Self::OutlineGeneration => "outline_generation",
        }
    }

    /// All known feature types.
    pub fn all() -> &'static [FeatureType] {
        &[
            Self::Chat,
            Self::Expansion,
            Self::Summary,
            Self::Polish,
            Self::SceneGeneration,
            Self::OutlineGeneration,
        ]
    }
}

impl std::str::FromStr for FeatureType {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "expansion" => Ok(Self::Expansion),
            "summary" => Ok(Self::Summary),
            "polish" => Ok(Self::Polish),
            "scene_generation" => Ok(Self::SceneGeneration),
            "outline_generation" => Ok(Self::OutlineGeneration),
            other => Err(PromptError::UnknownFeature(other.to_string())),
        }
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
