//! Multi-option outline fan-out.
//!
//! One request produces N independently generated options. Context and
//! prompt assembly run once; routing, the provider stream, the structured
//! extractor, and billing run per option, so one option failing (or one
//! pool key misbehaving) never touches its siblings.

use crate::pipeline::{BillingSink, RequestOrchestrator};
use inkflow_core::error::Result;
use inkflow_core::request::FeatureRequest;
use inkflow_streaming::{NoopSink, StructuredExtractor};
use std::sync::Arc;
use tracing::{debug, warn};

/// One generated outline option. `error` is set when this option failed;
/// siblings are unaffected.
#[derive(Debug, Clone)]
pub struct OutlineOption {
    /// 1-based position in the fan-out.
    pub ordinal: usize,
    pub title: String,
    pub content: String,
    pub error: Option<String>,
}

impl OutlineOption {
    fn failed(ordinal: usize, message: String) -> Self {
        Self {
            ordinal,
            title: format!("Option {ordinal}"),
            content: String::new(),
            error: Some(message),
        }
    }
}

impl RequestOrchestrator {
    /// Generate `request.option_count` options in parallel.
    ///
    /// Returns options in ordinal order. Aggregation or prompt failures
    /// fail the whole request; anything after the fan-out point is
    /// isolated per option.
    pub async fn generate_options(
        self: Arc<Self>,
        request: &FeatureRequest,
    ) -> Result<Vec<OutlineOption>> {
        let count = request.option_count.max(1);
        let prompts = self.assemble(request).await?;

        let mut handles = Vec::with_capacity(count);
        for ordinal in 1..=count {
            let orchestrator = self.clone();
            let request = request.clone();
            let prompts = prompts.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.run_option(ordinal, &request, &prompts).await
            }));
        }

        let joined = futures::future::join_all(handles).await;
        Ok(joined
            .into_iter()
            .enumerate()
            .map(|(i, result)| {
                result.unwrap_or_else(|err| {
                    warn!(ordinal = i + 1, error = %err, "option task panicked");
                    OutlineOption::failed(i + 1, format!("option task failed: {err}"))
                })
            })
            .collect())
    }

    async fn run_option(
        &self,
        ordinal: usize,
        request: &FeatureRequest,
        prompts: &crate::pipeline::AssembledPrompts,
    ) -> OutlineOption {
        let prepared = match self.route_call(request, prompts, true).await {
            Ok(prepared) => prepared,
            Err(err) => return OutlineOption::failed(ordinal, err.to_string()),
        };
        let upstream = match prepared
            .routed
            .provider
            .generate_stream(prepared.call.clone())
            .await
        {
            Ok(rx) => rx,
            Err(err) => return OutlineOption::failed(ordinal, err.to_string()),
        };

        let sink = Arc::new(BillingSink {
            billing: self.billing().clone(),
            persistence: Arc::new(NoopSink),
            user_id: request.user_id.clone(),
            provider: prepared.routed.key.provider_name.clone(),
            model_id: prepared.routed.model.clone(),
            feature: request.feature,
            prompt: prepared.call,
        });
        let mut rx = self.supervisor().supervise(upstream, sink);

        let mut extractor = StructuredExtractor::new(ordinal);
        let mut title: Option<String> = None;
        let mut content = String::new();
        let mut error = None;

        while let Some(event) = rx.recv().await {
            match event {
                Ok(chunk) => {
                    if let Some(text) = chunk.content.as_deref()
                        && !text.is_empty()
                        && let Some(extracted) = extractor.feed(text)
                    {
                        if extracted.title.is_some() {
                            title = extracted.title;
                        }
                        content.push_str(&extracted.content);
                    }
                    if chunk.done {
                        break;
                    }
                }
                Err(err) => {
                    error = Some(err.to_string());
                    break;
                }
            }
        }

        let terminal = extractor.finish();
        if title.is_none() {
            title = terminal.title;
        }
        content.push_str(&terminal.content);

        debug!(ordinal, title = title.as_deref().unwrap_or(""), failed = error.is_some(), "option finished");
        OutlineOption {
            ordinal,
            title: title.unwrap_or_else(|| format!("Option {ordinal}")),
            content,
            error,
        }
    }
}
