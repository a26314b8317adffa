//! Read-only novel structure, used to build the containment index.
//!
//! The structural tree (acts → chapters → scenes) comes from persistence
//! outside the core. Mutation notifications arrive as explicit cache
//! invalidations, not through this trait.

use crate::error::ContextError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A scene — the leaf of the structural tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: String,
}

/// A chapter and its scenes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterNode {
    pub id: String,
    #[serde(default)]
    pub scenes: Vec<SceneNode>,
}

/// An act and its chapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActNode {
    pub id: String,
    #[serde(default)]
    pub chapters: Vec<ChapterNode>,
}

/// The full structural tree of one novel, plus display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelStructure {
    pub novel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub acts: Vec<ActNode>,
}

/// Read-only access to novel structure and metadata.
#[async_trait]
pub trait NovelReader: Send + Sync {
    /// Fetch the structural tree for a novel.
    async fn structure(
        &self,
        novel_id: &str,
    ) -> std::result::Result<NovelStructure, ContextError>;
}
