//! Provider router — public/private decision and instance caching.
//!
//! A request is public iff it carries a public-model-config id; the
//! legacy boolean flag is never trusted on its own. Public configs gate
//! on an overall enabled flag and a per-feature enabled set, and
//! violations reject the request before any network call.
//!
//! Instances are cached per (owner, provider, model) with compute-if-
//! absent; a concurrent duplicate construction is wasteful but not
//! unsafe. Failed constructions are never stored.

use crate::factory::{ProviderFactory, ProviderSpec};
use crate::public_config::PublicConfigStore;
use inkflow_core::credentials::CredentialStore;
use inkflow_core::error::ProviderError;
use inkflow_core::provider::ModelProvider;
use inkflow_core::request::FeatureRequest;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Cache key for one provider instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    pub owner_id: String,
    pub provider_name: String,
    pub model_name: String,
}

/// How the resolved route will be billed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// The user's own credentials.
    Private,
    /// A shared pool, billed in credits against this config.
    Public { config_id: String },
}

/// A resolved route: the live provider plus billing classification.
#[derive(Clone)]
pub struct RoutedProvider {
    pub provider: Arc<dyn ModelProvider>,
    pub key: ProviderKey,
    pub route: RouteKind,
    /// The model the call should name (public configs pin their own).
    pub model: String,
}

impl std::fmt::Debug for RoutedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedProvider")
            .field("provider", &self.provider.name())
            .field("key", &self.key)
            .field("route", &self.route)
            .field("model", &self.model)
            .finish()
    }
}

/// Routes requests to cached provider instances.
pub struct ProviderRouter {
    factory: Arc<dyn ProviderFactory>,
    credentials: Arc<dyn CredentialStore>,
    public_configs: Arc<dyn PublicConfigStore>,
    cache: RwLock<HashMap<ProviderKey, Arc<dyn ModelProvider>>>,
}

impl ProviderRouter {
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        credentials: Arc<dyn CredentialStore>,
        public_configs: Arc<dyn PublicConfigStore>,
    ) -> Self {
        Self {
            factory,
            credentials,
            public_configs,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the provider for a request.
    ///
    /// Configuration violations (missing/disabled config, feature not
    /// enabled, missing credentials) reject here, before any network call.
    pub async fn resolve(
        &self,
        request: &FeatureRequest,
    ) -> std::result::Result<RoutedProvider, ProviderError> {
        if let Some(config_id) = &request.public_model_config_id {
            return self.resolve_public(request, config_id).await;
        }

        if request.use_public_model {
            // Legacy flag with no config id carries no config to validate.
            warn!(
                user_id = %request.user_id,
                "Legacy public-model flag set without a config id, routing privately"
            );
        }

        self.resolve_private(request).await
    }

    async fn resolve_public(
        &self,
        request: &FeatureRequest,
        config_id: &str,
    ) -> std::result::Result<RoutedProvider, ProviderError> {
        let config = self
            .public_configs
            .get(config_id)
            .await?
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("Public model config '{config_id}' not found"))
            })?;

        if !config.enabled {
            return Err(ProviderError::ConfigDisabled {
                config_id: config_id.to_string(),
            });
        }
        if !config.allows(request.feature) {
            return Err(ProviderError::FeatureNotEnabled {
                feature: request.feature.to_string(),
                config_id: config_id.to_string(),
            });
        }

        // The random pick happens per call; each pool key owns its own
        // cached instance, so the pick selects among cached instances.
        let (key_idx, api_key) = config.pick_key().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Public model config '{config_id}' has no API keys in its pool"
            ))
        })?;

        let cache_key = ProviderKey {
            owner_id: format!("public:{config_id}:{key_idx}"),
            provider_name: config.provider.clone(),
            model_name: config.model_id.clone(),
        };

        let provider = self
            .get_or_create(&cache_key, || ProviderSpec {
                provider_name: config.provider.clone(),
                model_name: config.model_id.clone(),
                api_key: api_key.to_string(),
            })
            .await?;

        info!(
            config_id,
            provider = %config.provider,
            model = %config.model_id,
            "Routed to public model pool"
        );

        Ok(RoutedProvider {
            provider,
            key: cache_key,
            route: RouteKind::Public {
                config_id: config_id.to_string(),
            },
            model: config.model_id.clone(),
        })
    }

    async fn resolve_private(
        &self,
        request: &FeatureRequest,
    ) -> std::result::Result<RoutedProvider, ProviderError> {
        let provider_name = request.provider_name.clone().ok_or_else(|| {
            ProviderError::NotConfigured("Private request carries no provider name".into())
        })?;
        let model_name = request.model_name.clone().ok_or_else(|| {
            ProviderError::NotConfigured("Private request carries no model name".into())
        })?;

        let cache_key = ProviderKey {
            owner_id: request.user_id.clone(),
            provider_name: provider_name.clone(),
            model_name: model_name.clone(),
        };

        if let Some(provider) = self.cached(&cache_key) {
            debug!(owner = %request.user_id, provider = %provider_name, "Provider cache hit");
            return Ok(RoutedProvider {
                provider,
                key: cache_key,
                route: RouteKind::Private,
                model: model_name,
            });
        }

        let api_key = self
            .credentials
            .decrypt_key(&request.user_id, &provider_name)
            .await
            .map_err(|e| ProviderError::CredentialResolution {
                owner_id: request.user_id.clone(),
                reason: e.to_string(),
            })?;

        let provider = self
            .get_or_create(&cache_key, || ProviderSpec {
                provider_name: provider_name.clone(),
                model_name: model_name.clone(),
                api_key,
            })
            .await?;

        Ok(RoutedProvider {
            provider,
            key: cache_key,
            route: RouteKind::Private,
            model: model_name,
        })
    }

    fn cached(&self, key: &ProviderKey) -> Option<Arc<dyn ModelProvider>> {
        self.cache.read().unwrap().get(key).cloned()
    }

    /// Compute-if-absent. Construction happens outside the lock; a failed
    /// construction is returned as an error and never inserted.
    async fn get_or_create(
        &self,
        key: &ProviderKey,
        spec: impl FnOnce() -> ProviderSpec,
    ) -> std::result::Result<Arc<dyn ModelProvider>, ProviderError> {
        if let Some(provider) = self.cached(key) {
            return Ok(provider);
        }

        let provider = self.factory.create(&spec()).await?;
        self.cache
            .write()
            .unwrap()
            .insert(key.clone(), Arc::clone(&provider));
        debug!(owner = %key.owner_id, provider = %key.provider_name, model = %key.model_name, "Provider instance constructed and cached");
        Ok(provider)
    }

    /// Evict every cached instance. Fired on global provider-mode toggles.
    pub fn clear_all(&self) {
        let mut cache = self.cache.write().unwrap();
        let evicted = cache.len();
        cache.clear();
        info!(evicted, "Provider cache cleared");
    }

    /// Evict one owner's instances only.
    pub fn clear_owner(&self, owner_id: &str) {
        let mut cache = self.cache.write().unwrap();
        let before = cache.len();
        cache.retain(|k, _| k.owner_id != owner_id);
        debug!(owner_id, evicted = before - cache.len(), "Owner provider cache cleared");
    }

    /// Number of cached instances.
    pub fn cached_count(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}
