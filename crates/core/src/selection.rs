//! Context selections — user-chosen references to story content.
//!
//! A selection names a piece of content by id and kind. Kinds carry a
//! dedup priority (containers first) so the aggregator can let a chapter
//! claim its scenes before the scenes are considered individually.

use serde::{Deserialize, Serialize};

/// The kind of content a selection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    FullNovelText,
    FullNovelSummary,
    Act,
    Chapter,
    Scene,
    Character,
    Location,
    Item,
    Lore,
    Snippet,
}

impl ContextKind {
    /// Canonical string form, used as the content-provider registry key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullNovelText => "full_novel_text",
            Self::FullNovelSummary => "full_novel_summary",
            Self::Act => "act",
            Self::Chapter => "chapter",
            Self::Scene => "scene",
            Self::Character => "character",
            Self::Location => "location",
            Self::Item => "item",
            Self::Lore => "lore",
            Self::Snippet => "snippet",
        }
    }

    /// Dedup priority. Lower is processed first, so containers claim their
    /// descendants before those descendants are considered individually.
    pub fn priority(&self) -> u8 {
        match self {
            Self::FullNovelText => 1,
            Self::FullNovelSummary => 2,
            Self::Act => 3,
            Self::Chapter => 4,
            Self::Scene => 5,
            Self::Character | Self::Location | Self::Item | Self::Lore => 6,
            Self::Snippet => 7,
        }
    }

    /// Whether this kind can structurally contain other selections.
    /// Only these kinds force a containment-index build during dedup.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::FullNovelText | Self::FullNovelSummary | Self::Act | Self::Chapter
        )
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-chosen reference to a piece of story content.
///
/// Immutable per request; the core never mutates the caller's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSelection {
    /// Content id as supplied by the caller.
    pub id: String,
    /// What the id refers to.
    pub kind: ContextKind,
}

impl ContextSelection {
    pub fn new(id: impl Into<String>, kind: ContextKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Normalized id used for containment lookups and equality dedup.
    /// Trims whitespace and lowercases, so "C1 " and "c1" collide.
    pub fn normalized_id(&self) -> String {
        self.id.trim().to_ascii_lowercase()
    }
}
