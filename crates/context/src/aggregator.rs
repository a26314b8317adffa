//! Context aggregator — dedupe, fetch, concatenate.
//!
//! Contract: `dedupe(selections)` returns a subset where no survivor's
//! normalized id lies inside another survivor's containment set, with
//! containers processed before their descendants. `aggregate` then reads
//! each survivor through the registry and joins the non-empty blocks with
//! a blank line.

use crate::containment::{ContainmentCache, ContainmentIndex};
use crate::registry::ContentProviderRegistry;
use inkflow_core::request::FeatureRequest;
use inkflow_core::selection::ContextSelection;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Deduplicates and aggregates the caller's context selections.
pub struct ContextAggregator {
    cache: Arc<ContainmentCache>,
    registry: Arc<ContentProviderRegistry>,
}

impl ContextAggregator {
    pub fn new(cache: Arc<ContainmentCache>, registry: Arc<ContentProviderRegistry>) -> Self {
        Self { cache, registry }
    }

    /// Remove redundant selections.
    ///
    /// Fast path: when no selection can structurally contain another, only
    /// exact normalized-id duplicates are dropped — no index build, no I/O.
    /// Otherwise the containment index decides: containers are walked in
    /// priority order and claim every descendant id before those
    /// descendants are considered individually.
    pub async fn dedupe(
        &self,
        selections: &[ContextSelection],
        novel_id: Option<&str>,
    ) -> Vec<ContextSelection> {
        if selections.is_empty() {
            return Vec::new();
        }

        if !selections.iter().any(|s| s.kind.is_container()) {
            return Self::dedupe_flat(selections);
        }

        let index = match novel_id {
            Some(id) => self.cache.get_or_build(id).await,
            None => Arc::new(ContainmentIndex::empty()),
        };

        // Stable sort: containers first, caller order preserved within a kind.
        let mut sorted: Vec<&ContextSelection> = selections.iter().collect();
        sorted.sort_by_key(|s| s.kind.priority());

        let mut excluded: HashSet<String> = HashSet::new();
        let mut survivors: Vec<ContextSelection> = Vec::new();

        for selection in sorted {
            let id = selection.normalized_id();
            if excluded.contains(&id) {
                debug!(id = %selection.id, kind = %selection.kind, "Selection claimed by a container, skipping");
                continue;
            }
            if let Some(contained) = index.contained(&id) {
                excluded.extend(contained.iter().cloned());
            }
            excluded.insert(id);
            survivors.push(selection.clone());
        }

        survivors
    }

    fn dedupe_flat(selections: &[ContextSelection]) -> Vec<ContextSelection> {
        let mut seen: HashSet<String> = HashSet::new();
        selections
            .iter()
            .filter(|s| seen.insert(s.normalized_id()))
            .cloned()
            .collect()
    }

    /// Dedupe the request's selections, read each survivor's content, and
    /// concatenate the non-empty blocks with blank-line separation.
    ///
    /// A reader failure for one selection is isolated: logged, treated as
    /// empty content, never failing the whole aggregation.
    pub async fn aggregate(&self, request: &FeatureRequest) -> String {
        let survivors = self
            .dedupe(&request.selections, request.novel_id.as_deref())
            .await;

        let mut blocks: Vec<String> = Vec::new();

        for selection in &survivors {
            let kind = selection.kind.as_str();
            let Some(provider) = self.registry.get(kind) else {
                warn!(kind, id = %selection.id, "No content provider registered, skipping selection");
                continue;
            };

            match provider.get_content(&selection.id, request).await {
                Ok(Some(text)) if !text.trim().is_empty() => blocks.push(text),
                Ok(_) => {
                    debug!(kind, id = %selection.id, "Selection resolved to empty content");
                }
                Err(e) => {
                    warn!(kind, id = %selection.id, error = %e, "Content read failed, treating as empty");
                }
            }
        }

        blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inkflow_core::content::ContentProvider;
    use inkflow_core::error::ContextError;
    use inkflow_core::feature::FeatureType;
    use inkflow_core::novel::{ActNode, ChapterNode, NovelReader, NovelStructure, SceneNode};
    use inkflow_core::selection::ContextKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TreeReader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NovelReader for TreeReader {
        async fn structure(&self, _novel_id: &str) -> Result<NovelStructure, ContextError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(NovelStructure {
                novel_id: "N1".into(),
                title: None,
                author: None,
                acts: vec![ActNode {
                    id: "A1".into(),
                    chapters: vec![ChapterNode {
                        id: "C1".into(),
                        scenes: vec![
                            SceneNode { id: "S1".into() },
                            SceneNode { id: "S2".into() },
                        ],
                    }],
                }],
            })
        }
    }

    struct CountingContent {
        kind: &'static str,
        fetches: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ContentProvider for CountingContent {
        fn kind(&self) -> &str {
            self.kind
        }

        async fn get_content(
            &self,
            id: &str,
            _request: &FeatureRequest,
        ) -> Result<Option<String>, ContextError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ContextError::ReadFailed {
                    kind: self.kind.into(),
                    id: id.into(),
                    reason: "storage offline".into(),
                });
            }
            Ok(Some(format!("[{} {id}]", self.kind)))
        }
    }

    fn aggregator_with(
        providers: Vec<(&'static str, Arc<AtomicUsize>, bool)>,
    ) -> (ContextAggregator, Arc<TreeReader>) {
        let reader = Arc::new(TreeReader {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(ContainmentCache::new(reader.clone()));
        let registry = Arc::new(ContentProviderRegistry::new());
        for (kind, fetches, fail) in providers {
            registry.register(Arc::new(CountingContent {
                kind,
                fetches,
                fail,
            }));
        }
        (ContextAggregator::new(cache, registry), reader)
    }

    fn request_with(selections: Vec<ContextSelection>) -> FeatureRequest {
        FeatureRequest::builder("u-1", FeatureType::Expansion)
            .novel("N1")
            .selections(selections)
            .build()
    }

    #[tokio::test]
    async fn chapter_claims_its_scene() {
        let chapter_fetches = Arc::new(AtomicUsize::new(0));
        let scene_fetches = Arc::new(AtomicUsize::new(0));
        let (aggregator, _) = aggregator_with(vec![
            ("chapter", chapter_fetches.clone(), false),
            ("scene", scene_fetches.clone(), false),
        ]);

        let request = request_with(vec![
            ContextSelection::new("C1", ContextKind::Chapter),
            ContextSelection::new("S1", ContextKind::Scene),
        ]);

        let text = aggregator.aggregate(&request).await;
        assert_eq!(text, "[chapter C1]");
        assert_eq!(chapter_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(scene_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dedupe_is_idempotent() {
        let (aggregator, _) = aggregator_with(vec![]);
        let selections = vec![
            ContextSelection::new("C1", ContextKind::Chapter),
            ContextSelection::new("S1", ContextKind::Scene),
            ContextSelection::new("S2", ContextKind::Scene),
            ContextSelection::new("lore-1", ContextKind::Lore),
        ];

        let once = aggregator.dedupe(&selections, Some("N1")).await;
        let twice = aggregator.dedupe(&once, Some("N1")).await;
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn fast_path_skips_index_build() {
        let (aggregator, reader) = aggregator_with(vec![]);
        let selections = vec![
            ContextSelection::new("S1", ContextKind::Scene),
            ContextSelection::new("S1", ContextKind::Scene),
            ContextSelection::new("snip-1", ContextKind::Snippet),
        ];

        let survivors = aggregator.dedupe(&selections, Some("N1")).await;
        assert_eq!(survivors.len(), 2);
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn full_novel_claims_everything() {
        let (aggregator, _) = aggregator_with(vec![]);
        let selections = vec![
            ContextSelection::new("S2", ContextKind::Scene),
            ContextSelection::new("N1", ContextKind::FullNovelText),
            ContextSelection::new("C1", ContextKind::Chapter),
        ];

        let survivors = aggregator.dedupe(&selections, Some("N1")).await;
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].kind, ContextKind::FullNovelText);
    }

    #[tokio::test]
    async fn full_novel_pseudo_id_claims_everything() {
        let (aggregator, _) = aggregator_with(vec![]);
        let selections = vec![
            ContextSelection::new("S2", ContextKind::Scene),
            ContextSelection::new("full_novel_text", ContextKind::FullNovelText),
            ContextSelection::new("C1", ContextKind::Chapter),
        ];

        let survivors = aggregator.dedupe(&selections, Some("N1")).await;
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].kind, ContextKind::FullNovelText);
    }

    #[tokio::test]
    async fn container_order_follows_priority() {
        let (aggregator, _) = aggregator_with(vec![]);
        let selections = vec![
            ContextSelection::new("snip-1", ContextKind::Snippet),
            ContextSelection::new("C1", ContextKind::Chapter),
            ContextSelection::new("lore-1", ContextKind::Lore),
        ];

        let survivors = aggregator.dedupe(&selections, Some("N1")).await;
        let kinds: Vec<ContextKind> = survivors.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ContextKind::Chapter, ContextKind::Lore, ContextKind::Snippet]
        );
    }

    #[tokio::test]
    async fn reader_failure_is_isolated() {
        let chapter_fetches = Arc::new(AtomicUsize::new(0));
        let lore_fetches = Arc::new(AtomicUsize::new(0));
        let (aggregator, _) = aggregator_with(vec![
            ("chapter", chapter_fetches, true),
            ("lore", lore_fetches, false),
        ]);

        let request = request_with(vec![
            ContextSelection::new("C1", ContextKind::Chapter),
            ContextSelection::new("lore-1", ContextKind::Lore),
        ]);

        let text = aggregator.aggregate(&request).await;
        assert_eq!(text, "[lore lore-1]");
    }

    #[tokio::test]
    async fn unregistered_kind_is_skipped() {
        let (aggregator, _) = aggregator_with(vec![]);
        let request = request_with(vec![ContextSelection::new("item-1", ContextKind::Item)]);
        let text = aggregator.aggregate(&request).await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn blocks_joined_with_blank_line() {
        let scene_fetches = Arc::new(AtomicUsize::new(0));
        let lore_fetches = Arc::new(AtomicUsize::new(0));
        let (aggregator, _) = aggregator_with(vec![
            ("scene", scene_fetches, false),
            ("lore", lore_fetches, false),
        ]);

        let request = request_with(vec![
            ContextSelection::new("S1", ContextKind::Scene),
            ContextSelection::new("lore-1", ContextKind::Lore),
        ]);

        let text = aggregator.aggregate(&request).await;
        assert_eq!(text, "[scene S1]\n\n[lore lore-1]");
    }

    #[tokio::test]
    async fn no_novel_id_degrades_to_flat_dedup() {
        let (aggregator, reader) = aggregator_with(vec![]);
        let selections = vec![
            ContextSelection::new("C1", ContextKind::Chapter),
            ContextSelection::new("S1", ContextKind::Scene),
        ];

        // Without a novel id there is no tree to consult; both survive.
        let survivors = aggregator.dedupe(&selections, None).await;
        assert_eq!(survivors.len(), 2);
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    }
}
