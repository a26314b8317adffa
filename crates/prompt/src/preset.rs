//! Prompt presets.
//!
//! A preset captures the resolved prompt pair for one request
//! configuration, keyed by a deterministic hash of the semantically
//! relevant fields. Identical configurations reuse one preset instead of
//! duplicating prompt text; reuse bumps `use_count`.

use crate::assembler::ResolvedTemplate;
use inkflow_core::feature::FeatureType;
use inkflow_core::request::FeatureRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// A stored prompt preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPreset {
    pub preset_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub novel_id: Option<String>,
    pub config_hash: String,
    /// Snapshot of the hashed request fields, for inspection.
    pub request_snapshot: serde_json::Value,
    pub system_prompt: String,
    pub user_prompt: String,
    pub feature: FeatureType,
    pub use_count: u64,
}

/// Hash the semantically relevant request fields.
///
/// Selections are sorted before hashing so the hash is stable under
/// caller reordering. Sampling parameters are formatted with fixed
/// precision to keep float noise out of the key.
pub fn config_hash(request: &FeatureRequest) -> String {
    let mut selections: Vec<(String, String)> = request
        .selections
        .iter()
        .map(|s| (s.kind.as_str().to_string(), s.normalized_id()))
        .collect();
    selections.sort();
    selections.dedup();

    let canonical = serde_json::json!({
        "feature": request.feature.as_str(),
        "instructions": request.instructions,
        "selections": selections,
        "template_id": request.template_id,
        "temperature": request.temperature.map(|t| format!("{t:.4}")),
        "max_tokens": request.max_tokens,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// In-memory preset store keyed by config hash.
#[derive(Default)]
pub struct PresetStore {
    presets: RwLock<HashMap<String, PromptPreset>>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the preset for this request configuration, creating it from
    /// the resolved prompts on a miss. A hit increments `use_count`.
    pub fn get_or_insert(
        &self,
        request: &FeatureRequest,
        resolved: &ResolvedTemplate,
    ) -> PromptPreset {
        let hash = config_hash(request);
        let mut presets = self.presets.write().unwrap();

        if let Some(preset) = presets.get_mut(&hash) {
            preset.use_count += 1;
            return preset.clone();
        }

        let snapshot = serde_json::json!({
            "feature": request.feature.as_str(),
            "instructions": request.instructions,
            "selection_count": request.selections.len(),
            "template_id": resolved.template_id,
        });

        let preset = PromptPreset {
            preset_id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            novel_id: request.novel_id.clone(),
            config_hash: hash.clone(),
            request_snapshot: snapshot,
            system_prompt: resolved.system_prompt.clone(),
            user_prompt: resolved.user_prompt.clone(),
            feature: request.feature,
            use_count: 1,
        };
        presets.insert(hash, preset.clone());
        preset
    }

    /// Look up a preset by its config hash.
    pub fn get(&self, hash: &str) -> Option<PromptPreset> {
        self.presets.read().unwrap().get(hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.presets.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkflow_core::selection::{ContextKind, ContextSelection};

    fn resolved() -> ResolvedTemplate {
        ResolvedTemplate {
            template_id: None,
            system_prompt: "sys".into(),
            user_prompt: "usr".into(),
        }
    }

    #[test]
    fn hash_stable_under_selection_reorder() {
        let a = FeatureRequest::builder("u-1", FeatureType::Summary)
            .select(ContextSelection::new("C1", ContextKind::Chapter))
            .select(ContextSelection::new("S1", ContextKind::Scene))
            .build();
        let b = FeatureRequest::builder("u-1", FeatureType::Summary)
            .select(ContextSelection::new("S1", ContextKind::Scene))
            .select(ContextSelection::new("C1", ContextKind::Chapter))
            .build();

        assert_eq!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn hash_changes_with_instructions() {
        let a = FeatureRequest::builder("u-1", FeatureType::Summary)
            .instructions("short")
            .build();
        let b = FeatureRequest::builder("u-1", FeatureType::Summary)
            .instructions("long")
            .build();
        assert_ne!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn hash_changes_with_feature() {
        let a = FeatureRequest::builder("u-1", FeatureType::Summary).build();
        let b = FeatureRequest::builder("u-1", FeatureType::Chat).build();
        assert_ne!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn store_reuses_identical_configs() {
        let store = PresetStore::new();
        let request = FeatureRequest::builder("u-1", FeatureType::Summary)
            .instructions("tight")
            .build();

        let first = store.get_or_insert(&request, &resolved());
        let second = store.get_or_insert(&request, &resolved());

        assert_eq!(first.preset_id, second.preset_id);
        assert_eq!(second.use_count, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn different_configs_get_different_presets() {
        let store = PresetStore::new();
        let a = FeatureRequest::builder("u-1", FeatureType::Summary).build();
        let b = FeatureRequest::builder("u-1", FeatureType::Expansion).build();

        store.get_or_insert(&a, &resolved());
        store.get_or_insert(&b, &resolved());
        assert_eq!(store.len(), 2);
    }
}
