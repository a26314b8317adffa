//! Content provider registry.
//!
//! Providers are registered and looked up by the kind-name string they
//! serve. Kinds without a registered provider are skipped at aggregation
//! time with a warning, never an error.

use inkflow_core::content::ContentProvider;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Keyed lookup of per-kind content readers.
#[derive(Default)]
pub struct ContentProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn ContentProvider>>>,
}

impl ContentProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own kind name. Replaces any previous
    /// provider for that kind.
    pub fn register(&self, provider: Arc<dyn ContentProvider>) {
        let kind = provider.kind().to_string();
        self.providers.write().unwrap().insert(kind, provider);
    }

    /// Look up the provider for a kind name.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ContentProvider>> {
        self.providers.read().unwrap().get(kind).cloned()
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.providers.read().unwrap().keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.providers.read().unwrap().len()
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
    use inkflow_core::request::FeatureRequest;

    struct FixedProvider {
        kind: &'static str,
    }

    #[async_trait]
    impl ContentProvider for FixedProvider {
        fn kind(&self) -> &str {
            self.kind
        }

        async fn get_content(
            &self,
            id: &str,
            _request: &FeatureRequest,
        ) -> Result<Option<String>, ContextError> {
            Ok(Some(format!("{}:{id}", self.kind)))
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = ContentProviderRegistry::new();
        registry.register(Arc::new(FixedProvider { kind: "scene" }));
        registry.register(Arc::new(FixedProvider { kind: "chapter" }));

        assert!(registry.get("scene").is_some());
        assert!(registry.get("chapter").is_some());
        assert!(registry.get("lore").is_none());
        assert_eq!(registry.kinds(), vec!["chapter", "scene"]);
    }

    #[test]
    fn register_replaces() {
        let registry = ContentProviderRegistry::new();
        registry.register(Arc::new(FixedProvider { kind: "scene" }));
        registry.register(Arc::new(FixedProvider { kind: "scene" }));
        assert_eq!(registry.len(), 1);
    }
}
