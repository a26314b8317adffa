//! Public model configurations — shared, platform-funded credential pools.
//!
//! A public config names a provider/model pair, a pool of API keys, and
//! the features it may serve. One key is picked uniformly at random per
//! call for load distribution; the pick is not correctness-critical.

use inkflow_core::error::ProviderError;
use inkflow_core::feature::FeatureType;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// One shared model pool.
#[derive(Clone, Serialize, Deserialize)]
pub struct PublicModelConfig {
    pub config_id: String,
    pub provider: String,
    pub model_id: String,
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default)]
    pub enabled_features: HashSet<FeatureType>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl PublicModelConfig {
    /// Whether this pool may serve a feature. Gated by the overall kill
    /// switch and the per-feature enabled set.
    pub fn allows(&self, feature: FeatureType) -> bool {
        self.enabled && self.enabled_features.contains(&feature)
    }

    /// Pick one key uniformly at random, with its index in the pool.
    pub fn pick_key(&self) -> Option<(usize, &str)> {
        if self.api_keys.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.api_keys.len());
        Some((idx, self.api_keys[idx].as_str()))
    }
}

impl std::fmt::Debug for PublicModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicModelConfig")
            .field("config_id", &self.config_id)
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("enabled_features", &self.enabled_features)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Resolves a public-model-config id to its configuration.
#[async_trait]
pub trait PublicConfigStore: Send + Sync {
    async fn get(
        &self,
        config_id: &str,
    ) -> std::result::Result<Option<PublicModelConfig>, ProviderError>;
}

/// In-memory store, used in tests and for configs loaded at startup.
#[derive(Default)]
pub struct InMemoryPublicConfigs {
    configs: RwLock<HashMap<String, PublicModelConfig>>,
}

impl InMemoryPublicConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, config: PublicModelConfig) {
        self.configs
            .write()
            .unwrap()
            .insert(config.config_id.clone(), config);
    }

    pub fn len(&self) -> usize {
        self.configs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PublicConfigStore for InMemoryPublicConfigs {
    async fn get(
        &self,
        config_id: &str,
    ) -> std::result::Result<Option<PublicModelConfig>, ProviderError> {
        Ok(self.configs.read().unwrap().get(config_id).cloned())
    }
}
