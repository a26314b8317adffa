//! Provider routing for inkflow.
//!
//! Decides public vs. private model usage, resolves a cached provider
//! instance keyed by (owner, provider, model), and hands the pipeline an
//! `Arc<dyn ModelProvider>` ready to dispatch.

pub mod factory;
pub mod public_config;
pub mod router;

pub use factory::{ProviderFactory, ProviderSpec};
pub use public_config::{InMemoryPublicConfigs, PublicConfigStore, PublicModelConfig};
pub use router::{ProviderKey, ProviderRouter, RouteKind, RoutedProvider};
