//! Prompt assembler.
//!
//! Resolution priority for the template id (first match wins):
//! 1. Explicit id in the request — three namespaces (plain user template,
//!    `system_default_*` sentinel, `public_*` shared template), each
//!    validated before acceptance; invalid ids fall through silently.
//! 2. The caller's own default template for the feature.
//! 3. The feature's built-in default (`template_id` left `None`).
//!
//! Parameters are assembled once and shared by system- and user-prompt
//! generation. Custom prompt overrides bypass resolution entirely.

use crate::format::{output_format_suffix, OutputMode};
use crate::preset::PresetStore;
use inkflow_core::error::PromptError;
use inkflow_core::feature::FeatureType;
use inkflow_core::novel::NovelReader;
use inkflow_core::prompting::{FeaturePromptProvider, PromptParameters, TemplateStore};
use inkflow_core::request::FeatureRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix for system-default sentinel template ids.
pub const SYSTEM_DEFAULT_PREFIX: &str = "system_default_";
/// Prefix for shared public template ids.
pub const PUBLIC_PREFIX: &str = "public_";

/// The assembler's output: final prompt strings plus the template id that
/// produced them (`None` for the built-in default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTemplate {
    pub template_id: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Resolves templates and builds the final prompt pair for a request.
pub struct PromptAssembler {
    providers: HashMap<FeatureType, Arc<dyn FeaturePromptProvider>>,
    templates: Arc<dyn TemplateStore>,
    novels: Arc<dyn NovelReader>,
    presets: PresetStore,
}

impl PromptAssembler {
    pub fn new(templates: Arc<dyn TemplateStore>, novels: Arc<dyn NovelReader>) -> Self {
        Self {
            providers: HashMap::new(),
            templates,
            novels,
            presets: PresetStore::new(),
        }
    }

    /// The preset store accumulating resolved prompt configurations.
    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    /// Register the prompt provider for one feature.
    pub fn register(&mut self, provider: Arc<dyn FeaturePromptProvider>) {
        self.providers.insert(provider.feature(), provider);
    }

    /// Whether a feature has a registered prompt provider.
    pub fn supports(&self, feature: FeatureType) -> bool {
        self.providers.contains_key(&feature)
    }

    /// Build the final system/user prompt pair for a request.
    ///
    /// Fails only for a feature with no registered provider; template-id
    /// validation failures fall through the priority chain instead.
    pub async fn build_prompt(
        &self,
        request: &FeatureRequest,
        aggregated_context: &str,
    ) -> Result<ResolvedTemplate, PromptError> {
        let provider = self
            .providers
            .get(&request.feature)
            .ok_or_else(|| PromptError::ProviderMissing(request.feature.to_string()))?;

        let params = self.build_parameters(request, aggregated_context).await;

        // Custom prompts bypass template resolution entirely.
        let template_id = if request.custom_user_prompt.is_some() {
            None
        } else {
            self.resolve_template_id(request, provider.as_ref()).await
        };

        let system_prompt = match &request.custom_system_prompt {
            Some(custom) => custom.clone(),
            None => provider.system_prompt(&request.user_id, &params).await?,
        };

        let mut user_prompt = match &request.custom_user_prompt {
            Some(custom) => custom.clone(),
            None => {
                provider
                    .user_prompt(&request.user_id, template_id.as_deref(), &params)
                    .await?
            }
        };

        let mode = request
            .parameter_overrides
            .get("output_mode")
            .and_then(|m| OutputMode::from_str(m).ok())
            .unwrap_or_else(|| OutputMode::default_for(request.feature));
        if let Some(suffix) = output_format_suffix(request.feature, mode) {
            user_prompt.push_str(suffix);
        }

        let resolved = ResolvedTemplate {
            template_id,
            system_prompt,
            user_prompt,
        };

        // One-off custom prompts are not preset material; everything else
        // lands in the store so identical configurations share one preset.
        if request.custom_user_prompt.is_none() && request.custom_system_prompt.is_none() {
            let preset = self.presets.get_or_insert(request, &resolved);
            debug!(
                preset_id = %preset.preset_id,
                use_count = preset.use_count,
                "prompt preset resolved"
            );
        }

        Ok(resolved)
    }

    /// Assemble the shared parameter map. One pass; both prompts reuse it.
    async fn build_parameters(
        &self,
        request: &FeatureRequest,
        aggregated_context: &str,
    ) -> PromptParameters {
        let mut params = PromptParameters::new();

        if let Some(input) = &request.input_text {
            params.set("input", input.clone());
        }
        if !aggregated_context.is_empty() {
            params.set("context", aggregated_context);
        }
        if let Some(instructions) = &request.instructions {
            params.set("instructions", instructions.clone());
        }
        if let Some(chapter) = &request.current_chapter_id {
            params.set("current_chapter_id", chapter.clone());
        }
        if let Some(scene) = &request.current_scene_id {
            params.set("current_scene_id", scene.clone());
        }
        params.set("smart_context", if request.smart_context { "true" } else { "false" });

        // Novel metadata is best-effort: a structure-read failure defaults
        // the fields instead of failing prompt assembly.
        if let Some(novel_id) = &request.novel_id {
            match self.novels.structure(novel_id).await {
                Ok(tree) => {
                    params.set("novel_title", tree.title.unwrap_or_else(|| "Untitled".into()));
                    params.set("novel_author", tree.author.unwrap_or_else(|| "Unknown".into()));
                }
                Err(e) => {
                    debug!(novel_id, error = %e, "Novel metadata unavailable, using defaults");
                    params.set("novel_title", "Untitled");
                    params.set("novel_author", "Unknown");
                }
            }
        }

        // Caller overrides win last.
        params.merge(&request.parameter_overrides);
        params
    }

    /// Walk the template-id resolution chain.
    async fn resolve_template_id(
        &self,
        request: &FeatureRequest,
        provider: &dyn FeaturePromptProvider,
    ) -> Option<String> {
        // Priority 1: explicit id, validated per namespace.
        if let Some(explicit) = &request.template_id {
            if self.validate_template_id(request, provider, explicit).await {
                return Some(explicit.clone());
            }
            warn!(
                template_id = %explicit,
                user_id = %request.user_id,
                "Explicit template id failed validation, falling through"
            );
        }

        // Priority 2: the user's own default for this feature.
        match self
            .templates
            .default_template_for(&request.user_id, request.feature)
            .await
        {
            Ok(Some(id)) => return Some(id),
            Ok(None) => {}
            Err(e) => {
                warn!(user_id = %request.user_id, error = %e, "Default template lookup failed, falling through");
            }
        }

        // Priority 3: built-in default.
        None
    }

    async fn validate_template_id(
        &self,
        request: &FeatureRequest,
        provider: &dyn FeaturePromptProvider,
        id: &str,
    ) -> bool {
        if id.starts_with(SYSTEM_DEFAULT_PREFIX) {
            return provider.system_template_id().as_deref() == Some(id);
        }
        if id.starts_with(PUBLIC_PREFIX) {
            return self
                .templates
                .public_template_exists(id)
                .await
                .unwrap_or(false);
        }
        self.templates
            .user_template_exists(&request.user_id, id)
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inkflow_core::error::ContextError;
    use inkflow_core::novel::NovelStructure;

    struct StubPrompts {
        feature: FeatureType,
    }

    #[async_trait]
    impl FeaturePromptProvider for StubPrompts {
        fn feature(&self) -> FeatureType {
            self.feature
        }

        async fn system_prompt(
            &self,
            _user_id: &str,
            params: &PromptParameters,
        ) -> Result<String, PromptError> {
            Ok(format!(
                "system for {} of {}",
                self.feature,
                params.get("novel_title").unwrap_or("?")
            ))
        }

        async fn user_prompt(
            &self,
            _user_id: &str,
            template_id: Option<&str>,
            params: &PromptParameters,
        ) -> Result<String, PromptError> {
            let body = params.get("input").unwrap_or("nothing");
            Ok(match template_id {
                Some(id) => format!("[{id}] {body}"),
                None => format!("[builtin] {body}"),
            })
        }

        fn system_template_id(&self) -> Option<String> {
            Some(format!("{}{}", SYSTEM_DEFAULT_PREFIX, self.feature))
        }
    }

    struct StubTemplates {
        user_templates: Vec<(&'static str, &'static str)>,
        public_templates: Vec<&'static str>,
        default_for_user: Option<&'static str>,
    }

    #[async_trait]
    impl TemplateStore for StubTemplates {
        async fn user_template_exists(
            &self,
            user_id: &str,
            template_id: &str,
        ) -> Result<bool, PromptError> {
            Ok(self
                .user_templates
                .iter()
                .any(|(u, t)| *u == user_id && *t == template_id))
        }

        async fn public_template_exists(&self, template_id: &str) -> Result<bool, PromptError> {
            Ok(self.public_templates.contains(&template_id))
        }

        async fn default_template_for(
            &self,
            _user_id: &str,
            _feature: FeatureType,
        ) -> Result<Option<String>, PromptError> {
            Ok(self.default_for_user.map(String::from))
        }
    }

    struct StubNovels;

    #[async_trait]
    impl NovelReader for StubNovels {
        async fn structure(&self, novel_id: &str) -> Result<NovelStructure, ContextError> {
            if novel_id == "missing" {
                return Err(ContextError::StructureUnavailable {
                    novel_id: novel_id.into(),
                    reason: "gone".into(),
                });
            }
            Ok(NovelStructure {
                novel_id: novel_id.into(),
                title: Some("The Hollow Crown".into()),
                author: Some("A. Writer".into()),
                acts: vec![],
            })
        }
    }

    fn assembler(templates: StubTemplates) -> PromptAssembler {
        let mut assembler = PromptAssembler::new(Arc::new(templates), Arc::new(StubNovels));
        assembler.register(Arc::new(StubPrompts {
            feature: FeatureType::Expansion,
        }));
        assembler.register(Arc::new(StubPrompts {
            feature: FeatureType::OutlineGeneration,
        }));
        assembler
    }

    fn empty_store() -> StubTemplates {
        StubTemplates {
            user_templates: vec![],
            public_templates: vec![],
            default_for_user: None,
        }
    }

    #[tokio::test]
    async fn unregistered_feature_is_rejected() {
        let assembler = assembler(empty_store());
        let request = FeatureRequest::builder("u-1", FeatureType::Chat).build();
        let err = assembler.build_prompt(&request, "").await.unwrap_err();
        assert!(err.to_string().contains("chat"));
    }

    #[tokio::test]
    async fn builtin_default_when_nothing_set() {
        let assembler = assembler(empty_store());
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .input_text("a passage")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert!(resolved.template_id.is_none());
        assert_eq!(resolved.user_prompt, "[builtin] a passage");
        assert!(!resolved.system_prompt.is_empty());
    }

    #[tokio::test]
    async fn explicit_user_template_wins() {
        let assembler = assembler(StubTemplates {
            user_templates: vec![("u-1", "tpl-9")],
            public_templates: vec![],
            default_for_user: Some("tpl-default"),
        });
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .template("tpl-9")
            .input_text("x")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert_eq!(resolved.template_id.as_deref(), Some("tpl-9"));
    }

    #[tokio::test]
    async fn invalid_explicit_falls_to_user_default() {
        let assembler = assembler(StubTemplates {
            user_templates: vec![],
            public_templates: vec![],
            default_for_user: Some("tpl-default"),
        });
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .template("tpl-unknown")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert_eq!(resolved.template_id.as_deref(), Some("tpl-default"));
    }

    #[tokio::test]
    async fn public_namespace_is_validated() {
        let assembler = assembler(StubTemplates {
            user_templates: vec![],
            public_templates: vec!["public_epic"],
            default_for_user: None,
        });
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .template("public_epic")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert_eq!(resolved.template_id.as_deref(), Some("public_epic"));
    }

    #[tokio::test]
    async fn system_default_sentinel_accepted_when_it_matches() {
        let assembler = assembler(empty_store());
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .template("system_default_expansion")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert_eq!(
            resolved.template_id.as_deref(),
            Some("system_default_expansion")
        );
    }

    #[tokio::test]
    async fn custom_user_prompt_bypasses_resolution() {
        let assembler = assembler(StubTemplates {
            user_templates: vec![("u-1", "tpl-9")],
            public_templates: vec![],
            default_for_user: None,
        });
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .template("tpl-9")
            .custom_user_prompt("just do it")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert!(resolved.template_id.is_none());
        assert_eq!(resolved.user_prompt, "just do it");
    }

    #[tokio::test]
    async fn outline_gets_structured_suffix() {
        let assembler = assembler(empty_store());
        let request = FeatureRequest::builder("u-1", FeatureType::OutlineGeneration)
            .input_text("premise")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert!(resolved.user_prompt.contains("TITLE:"));
        assert!(resolved.user_prompt.contains("CONTENT:"));
    }

    #[tokio::test]
    async fn novel_metadata_defaults_when_unavailable() {
        let assembler = assembler(empty_store());
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .novel("missing")
            .build();

        let resolved = assembler.build_prompt(&request, "").await.unwrap();
        assert!(resolved.system_prompt.contains("Untitled"));
    }

    #[tokio::test]
    async fn identical_requests_share_one_preset() {
        let assembler = assembler(empty_store());
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .input_text("a passage")
            .instructions("keep the tone")
            .build();

        assembler.build_prompt(&request, "").await.unwrap();
        assembler.build_prompt(&request, "").await.unwrap();

        let hash = crate::preset::config_hash(&request);
        let preset = assembler.presets().get(&hash).unwrap();
        assert_eq!(preset.use_count, 2);
        assert_eq!(assembler.presets().len(), 1);
    }

    #[tokio::test]
    async fn custom_prompts_are_not_stored_as_presets() {
        let assembler = assembler(empty_store());
        let request = FeatureRequest::builder("u-1", FeatureType::Expansion)
            .custom_user_prompt("just do it")
            .build();

        assembler.build_prompt(&request, "").await.unwrap();
        assert!(assembler.presets().is_empty());
    }

    #[tokio::test]
    async fn prompts_never_both_empty() {
        let assembler = assembler(empty_store());
        for feature in [FeatureType::Expansion, FeatureType::OutlineGeneration] {
            let request = FeatureRequest::builder("u-1", feature).build();
            let resolved = assembler.build_prompt(&request, "").await.unwrap();
            assert!(
                !resolved.system_prompt.is_empty() || !resolved.user_prompt.is_empty(),
                "{feature} produced two empty prompts"
            );
        }
    }
}
