//! Prompt collaborator traits and the shared parameter map.
//!
//! `FeaturePromptProvider` supplies the per-feature template text (one
//! provider per feature, resolved through a factory in the prompt crate).
//! `TemplateStore` validates template ids and looks up user defaults.
//! `PromptParameters` is built once per request and shared between system-
//! and user-prompt generation to avoid duplicate I/O.

use crate::error::PromptError;
use crate::feature::FeatureType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// String-keyed parameter map for prompt rendering. Order-irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptParameters(HashMap<String, String>);

impl PromptParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merge `other` into self, overwriting existing keys.
    pub fn merge(&mut self, other: &HashMap<String, String>) {
        for (k, v) in other {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over key/value pairs (unspecified order).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// Supplies template text for one feature type.
#[async_trait]
pub trait FeaturePromptProvider: Send + Sync {
    /// The feature this provider serves.
    fn feature(&self) -> FeatureType;

    /// Render the system prompt for a user from the shared parameter map.
    async fn system_prompt(
        &self,
        user_id: &str,
        params: &PromptParameters,
    ) -> std::result::Result<String, PromptError>;

    /// Render the user prompt. `template_id` of `None` means the feature's
    /// built-in default text.
    async fn user_prompt(
        &self,
        user_id: &str,
        template_id: Option<&str>,
        params: &PromptParameters,
    ) -> std::result::Result<String, PromptError>;

    /// Placeholder names this feature's templates understand.
    fn supported_placeholders(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// The `system_default_*` sentinel id for this feature, if it has one.
    fn system_template_id(&self) -> Option<String> {
        None
    }
}

/// Validates template ids and resolves user defaults.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Does this user own a template with this id?
    async fn user_template_exists(
        &self,
        user_id: &str,
        template_id: &str,
    ) -> std::result::Result<bool, PromptError>;

    /// Does a shared `public_*` template with this id exist?
    async fn public_template_exists(
        &self,
        template_id: &str,
    ) -> std::result::Result<bool, PromptError>;

    /// The user's own default template id for a feature, if set.
    async fn default_template_for(
        &self,
        user_id: &str,
        feature: FeatureType,
    ) -> std::result::Result<Option<String>, PromptError>;
}
