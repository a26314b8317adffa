//! Provider construction seam.
//!
//! The router asks a factory to turn a resolved spec (provider name,
//! model, plaintext key) into a live `ModelProvider` instance. The
//! concrete factory — vendor SDK wiring, HTTP clients — lives outside
//! the core.

use inkflow_core::error::ProviderError;
use inkflow_core::provider::ModelProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Everything needed to construct one provider instance.
#[derive(Clone)]
pub struct ProviderSpec {
    pub provider_name: String,
    pub model_name: String,
    pub api_key: String,
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("provider_name", &self.provider_name)
            .field("model_name", &self.model_name)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Constructs provider instances. A construction failure is fatal for the
/// request and is never cached by the router.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(
        &self,
        spec: &ProviderSpec,
    ) -> std::result::Result<Arc<dyn ModelProvider>, ProviderError>;
}
