//! ContentProvider trait — per-kind content readers.
//!
//! The aggregator resolves each surviving selection to text through one of
//! these, looked up by the kind's name string. The concrete readers
//! (database, file store, RAG) live outside the core.

use crate::error::ContextError;
use crate::request::FeatureRequest;
use async_trait::async_trait;

/// Reads the text for one kind of content (scene, chapter, lore, ...).
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// The kind name this provider serves; must match
    /// `ContextKind::as_str()` for the kinds it handles.
    fn kind(&self) -> &str;

    /// Resolve an id to content text. `Ok(None)` means the id exists but
    /// has no text worth including.
    async fn get_content(
        &self,
        id: &str,
        request: &FeatureRequest,
    ) -> std::result::Result<Option<String>, ContextError>;
}
