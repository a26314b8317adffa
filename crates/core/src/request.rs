//! The platform-level feature request.
//!
//! One `FeatureRequest` describes everything a caller wants from an AI
//! feature: the feature itself, the curated context selections, optional
//! template/prompt overrides, sampling parameters, and routing hints.
//! Built through a typed builder — no dynamic field reflection.

use crate::feature::FeatureType;
use crate::selection::ContextSelection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single orchestration request, immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRequest {
    /// The requesting user (also the provider-cache owner for private calls).
    pub user_id: String,

    /// The novel this request operates on, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub novel_id: Option<String>,

    /// The requested AI feature.
    pub feature: FeatureType,

    /// User-curated context selections, in caller order.
    #[serde(default)]
    pub selections: Vec<ContextSelection>,

    /// The selected/raw input text the feature operates on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,

    /// Free-form instructions from the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Explicit template id override (plain, `system_default_*`, or
    /// `public_*` namespace). Invalid ids fall through to the next
    /// resolution priority rather than erroring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    /// Direct system-prompt override; bypasses template resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_system_prompt: Option<String>,

    /// Direct user-prompt override; bypasses template resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_user_prompt: Option<String>,

    /// Marker that makes this a public-pool request. The router re-validates
    /// the config's existence and feature gating before honoring it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_model_config_id: Option<String>,

    /// Legacy public-model flag. Never trusted on its own.
    #[serde(default)]
    pub use_public_model: bool,

    /// Private-route provider name (e.g., "anthropic").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    /// Model name for the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Where the user currently is in the manuscript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_chapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_scene_id: Option<String>,

    /// Whether smart-context retrieval was requested upstream.
    #[serde(default)]
    pub smart_context: bool,

    /// Sampling temperature. Left unset, the configured default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max tokens for the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Number of parallel options for fan-out features (outline generation).
    #[serde(default = "default_option_count")]
    pub option_count: usize,

    /// Caller-supplied parameter overrides, merged last into the prompt
    /// parameter map.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameter_overrides: HashMap<String, String>,
}

fn default_option_count() -> usize {
    1
}

impl FeatureRequest {
    /// Start building a request for a user and feature.
    pub fn builder(user_id: impl Into<String>, feature: FeatureType) -> FeatureRequestBuilder {
        FeatureRequestBuilder::new(user_id, feature)
    }
}

/// Typed builder for `FeatureRequest`.
#[derive(Debug, Clone)]
pub struct FeatureRequestBuilder {
    request: FeatureRequest,
}

impl FeatureRequestBuilder {
    fn new(user_id: impl Into<String>, feature: FeatureType) -> Self {
        Self {
            request: FeatureRequest {
                user_id: user_id.into(),
                novel_id: None,
                feature,
                selections: Vec::new(),
                input_text: None,
                instructions: None,
                template_id: None,
                custom_system_prompt: None,
                custom_user_prompt: None,
                public_model_config_id: None,
                use_public_model: false,
                provider_name: None,
                model_name: None,
                current_chapter_id: None,
                current_scene_id: None,
                smart_context: false,
                temperature: None,
                max_tokens: None,
                option_count: default_option_count(),
                parameter_overrides: HashMap::new(),
            },
        }
    }

    pub fn novel(mut self, novel_id: impl Into<String>) -> Self {
        self.request.novel_id = Some(novel_id.into());
        self
    }

    pub fn selections(mut self, selections: Vec<ContextSelection>) -> Self {
        self.request.selections = selections;
        self
    }

    pub fn select(mut self, selection: ContextSelection) -> Self {
        self.request.selections.push(selection);
        self
    }

    pub fn input_text(mut self, text: impl Into<String>) -> Self {
        self.request.input_text = Some(text.into());
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.request.instructions = Some(text.into());
        self
    }

    pub fn template(mut self, template_id: impl Into<String>) -> Self {
        self.request.template_id = Some(template_id.into());
        self
    }

    pub fn custom_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.request.custom_system_prompt = Some(prompt.into());
        self
    }

    pub fn custom_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.request.custom_user_prompt = Some(prompt.into());
        self
    }

    pub fn public_config(mut self, config_id: impl Into<String>) -> Self {
        self.request.public_model_config_id = Some(config_id.into());
        self.request.use_public_model = true;
        self
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.request.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.request.model_name = Some(name.into());
        self
    }

    pub fn position(
        mut self,
        chapter_id: Option<String>,
        scene_id: Option<String>,
    ) -> Self {
        self.request.current_chapter_id = chapter_id;
        self.request.current_scene_id = scene_id;
        self
    }

    pub fn smart_context(mut self, enabled: bool) -> Self {
        self.request.smart_context = enabled;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = Some(max_tokens);
        self
    }

    pub fn options(mut self, count: usize) -> Self {
        self.request.option_count = count.max(1);
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.parameter_overrides.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> FeatureRequest {
        self.request
    }
}
