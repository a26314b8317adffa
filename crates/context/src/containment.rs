//! Per-novel containment index and its cache.
//!
//! The index maps a normalized content id to the set of ids structurally
//! nested beneath it (novel ⊇ acts ⊇ chapters ⊇ scenes). Built lazily by
//! walking the novel tree once, cached until an explicit invalidation
//! fired on structural edits.

use inkflow_core::novel::{NovelReader, NovelStructure};
use inkflow_core::selection::ContextKind;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

fn normalize(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

/// Containment map for one novel.
#[derive(Debug, Clone, Default)]
pub struct ContainmentIndex {
    map: HashMap<String, HashSet<String>>,
}

impl ContainmentIndex {
    /// An index that contains nothing. Dedup degrades to exact-id equality.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the index from a structural tree.
    ///
    /// The novel's own id and the `full_novel_text`/`full_novel_summary`
    /// pseudo-ids all map to every act, chapter, and scene, so a
    /// full-novel selection claims the whole tree regardless of which id
    /// convention the caller uses. Acts map to their chapters and scenes;
    /// chapters to scenes.
    pub fn from_structure(tree: &NovelStructure) -> Self {
        let mut map: HashMap<String, HashSet<String>> = HashMap::new();
        let mut all: HashSet<String> = HashSet::new();

        for act in &tree.acts {
            let act_id = normalize(&act.id);
            let mut act_set: HashSet<String> = HashSet::new();

            for chapter in &act.chapters {
                let chapter_id = normalize(&chapter.id);
                let mut chapter_set: HashSet<String> = HashSet::new();

                for scene in &chapter.scenes {
                    chapter_set.insert(normalize(&scene.id));
                }

                act_set.insert(chapter_id.clone());
                act_set.extend(chapter_set.iter().cloned());
                map.insert(chapter_id, chapter_set);
            }

            all.insert(act_id.clone());
            all.extend(act_set.iter().cloned());
            map.insert(act_id, act_set);
        }

        let mut whole: HashSet<String> = all.clone();
        whole.insert(normalize(&tree.novel_id));
        map.insert(ContextKind::FullNovelText.as_str().to_string(), whole.clone());
        map.insert(ContextKind::FullNovelSummary.as_str().to_string(), whole);
        map.insert(normalize(&tree.novel_id), all);
        Self { map }
    }

    /// The set of ids contained by `id`, if any.
    pub fn contained(&self, id: &str) -> Option<&HashSet<String>> {
        self.map.get(&normalize(id))
    }

    /// Whether `inner` is structurally inside `outer`.
    pub fn is_inside(&self, inner: &str, outer: &str) -> bool {
        self.contained(outer)
            .is_some_and(|set| set.contains(&normalize(inner)))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Lazily built, explicitly invalidated cache of containment indexes.
///
/// Compute-if-absent discipline: a concurrent duplicate build is wasteful
/// but not unsafe, so no lock is held across the structural walk.
pub struct ContainmentCache {
    reader: Arc<dyn NovelReader>,
    indexes: RwLock<HashMap<String, Arc<ContainmentIndex>>>,
}

impl ContainmentCache {
    pub fn new(reader: Arc<dyn NovelReader>) -> Self {
        Self {
            reader,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the index for a novel, building it on a miss.
    ///
    /// A structure-read failure degrades to an empty index (flat dedup)
    /// and is not cached, so the next request retries the build.
    pub async fn get_or_build(&self, novel_id: &str) -> Arc<ContainmentIndex> {
        let key = normalize(novel_id);

        if let Some(index) = self.indexes.read().unwrap().get(&key) {
            return Arc::clone(index);
        }

        match self.reader.structure(novel_id).await {
            Ok(tree) => {
                let index = Arc::new(ContainmentIndex::from_structure(&tree));
                debug!(novel_id, entries = index.len(), "Built containment index");
                self.indexes
                    .write()
                    .unwrap()
                    .insert(key, Arc::clone(&index));
                index
            }
            Err(e) => {
                warn!(novel_id, error = %e, "Containment index build failed, degrading to flat dedup");
                Arc::new(ContainmentIndex::empty())
            }
        }
    }

    /// Drop the cached index for one novel. Fired on structural edits.
    pub fn invalidate(&self, novel_id: &str) {
        self.indexes.write().unwrap().remove(&normalize(novel_id));
    }

    /// Drop every cached index.
    pub fn clear(&self) {
        self.indexes.write().unwrap().clear();
    }

    /// Number of novels with a cached index.
    pub fn len(&self) -> usize {
        self.indexes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inkflow_core::error::ContextError;
    use inkflow_core::novel::{ActNode, ChapterNode, SceneNode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_tree() -> NovelStructure {
        NovelStructure {
            novel_id: "N1".into(),
            title: Some("Testament".into()),
            author: None,
            acts: vec![ActNode {
                id: "A1".into(),
                chapters: vec![
                    ChapterNode {
                        id: "C1".into(),
                        scenes: vec![SceneNode { id: "S1".into() }, SceneNode { id: "S2".into() }],
                    },
                    ChapterNode {
                        id: "C2".into(),
                        scenes: vec![SceneNode { id: "S3".into() }],
                    },
                ],
            }],
        }
    }

    struct CountingReader {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingReader {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl NovelReader for CountingReader {
        async fn structure(&self, novel_id: &str) -> Result<NovelStructure, ContextError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ContextError::StructureUnavailable {
                    novel_id: novel_id.into(),
                    reason: "db down".into(),
                });
            }
            Ok(sample_tree())
        }
    }

    #[test]
    fn index_covers_whole_tree() {
        let index = ContainmentIndex::from_structure(&sample_tree());

        assert!(index.is_inside("S1", "C1"));
        assert!(index.is_inside("S1", "A1"));
        assert!(index.is_inside("C2", "A1"));
        assert!(index.is_inside("S3", "N1"));
        assert!(!index.is_inside("S3", "C1"));
        assert!(!index.is_inside("C1", "C2"));
    }

    #[test]
    fn pseudo_ids_claim_the_whole_tree() {
        let index = ContainmentIndex::from_structure(&sample_tree());

        assert!(index.is_inside("S1", "full_novel_text"));
        assert!(index.is_inside("C2", "full_novel_text"));
        assert!(index.is_inside("A1", "full_novel_summary"));
        assert!(index.is_inside("N1", "full_novel_summary"));
    }

    #[test]
    fn index_normalizes_ids() {
        let index = ContainmentIndex::from_structure(&sample_tree());
        assert!(index.is_inside(" s1 ", "c1"));
        assert!(index.is_inside("S2", " C1"));
    }

    #[tokio::test]
    async fn cache_builds_once() {
        let reader = Arc::new(CountingReader::new(false));
        let cache = ContainmentCache::new(reader.clone());

        let first = cache.get_or_build("N1").await;
        let second = cache.get_or_build("N1").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_rebuild() {
        let reader = Arc::new(CountingReader::new(false));
        let cache = ContainmentCache::new(reader.clone());

        cache.get_or_build("N1").await;
        cache.invalidate("N1");
        cache.get_or_build("N1").await;
        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn build_failure_degrades_and_is_not_cached() {
        let reader = Arc::new(CountingReader::new(true));
        let cache = ContainmentCache::new(reader.clone());

        let index = cache.get_or_build("N1").await;
        assert!(index.is_empty());
        assert!(cache.is_empty());

        // Next access retries the build
        cache.get_or_build("N1").await;
        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }
}
