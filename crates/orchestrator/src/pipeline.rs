//! The end-to-end request pipeline.
//!
//! aggregate → assemble → route → generate → charge. Non-streaming calls
//! get a bounded retry at the provider layer; streaming calls return a
//! supervised chunk stream and settle billing in the background once the
//! generation side finishes, estimating usage when the vendor reported
//! none.

use async_trait::async_trait;
use inkflow_billing::{BillingEngine, GenerationUsage, UsageTransaction};
use inkflow_config::{AppConfig, RetryConfig, SamplingDefaults};
use inkflow_context::ContextAggregator;
use inkflow_core::error::{ProviderError, Result};
use inkflow_core::feature::FeatureType;
use inkflow_core::message::Message;
use inkflow_core::provider::{GenerationRequest, GenerationResponse, StreamChunk};
use inkflow_core::request::FeatureRequest;
use inkflow_prompt::PromptAssembler;
use inkflow_providers::ProviderRouter;
use inkflow_providers::RoutedProvider;
use inkflow_streaming::{CompletionSink, StreamEnd, StreamOutcome, StreamSupervisor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The result of one completed non-streaming request.
#[derive(Debug, Clone)]
pub struct CompletedGeneration {
    pub content: String,
    /// The model that actually responded.
    pub model: String,
    pub transaction: UsageTransaction,
}

/// The resolved system/user prompt pair for a request.
#[derive(Debug, Clone)]
pub(crate) struct AssembledPrompts {
    pub(crate) system: String,
    pub(crate) user: String,
}

/// A routed call ready for dispatch.
pub(crate) struct PreparedCall {
    pub(crate) routed: RoutedProvider,
    pub(crate) call: GenerationRequest,
}

/// Wires the whole pipeline together.
pub struct RequestOrchestrator {
    aggregator: Arc<ContextAggregator>,
    assembler: Arc<PromptAssembler>,
    router: Arc<ProviderRouter>,
    billing: Arc<BillingEngine>,
    supervisor: StreamSupervisor,
    retry: RetryConfig,
    defaults: SamplingDefaults,
}

impl RequestOrchestrator {
    pub fn new(
        aggregator: Arc<ContextAggregator>,
        assembler: Arc<PromptAssembler>,
        router: Arc<ProviderRouter>,
        billing: Arc<BillingEngine>,
        config: &AppConfig,
    ) -> Self {
        Self {
            aggregator,
            assembler,
            router,
            billing,
            supervisor: StreamSupervisor::new(config.streaming.clone()),
            retry: config.retry.clone(),
            defaults: config.defaults.clone(),
        }
    }

    /// Run one non-streaming request end to end.
    ///
    /// A declined deduction fails the request; the generated content is
    /// not returned to the caller.
    pub async fn execute(&self, request: &FeatureRequest) -> Result<CompletedGeneration> {
        let prepared = self.prepare(request, false).await?;
        let response = self.generate_with_retry(&prepared).await?;

        let usage = GenerationUsage::from_response(&prepared.call, &response);
        let transaction = self
            .billing
            .charge_for_request(
                &request.user_id,
                &prepared.routed.key.provider_name,
                &prepared.routed.model,
                request.feature,
                usage,
            )
            .await?;

        info!(
            user_id = %request.user_id,
            feature = request.feature.as_str(),
            model = %response.model,
            trace_id = %transaction.trace_id,
            "request completed"
        );
        Ok(CompletedGeneration {
            content: response.content,
            model: response.model,
            transaction,
        })
    }

    /// Run one streaming request.
    ///
    /// The returned receiver is the consumer-facing stream; dropping it
    /// never cancels generation. `persistence` receives the full outcome
    /// before billing settles. A post-stream deduction failure is logged
    /// and recorded on the transaction; delivered content stays delivered.
    pub async fn execute_stream(
        &self,
        request: &FeatureRequest,
        persistence: Arc<dyn CompletionSink>,
    ) -> Result<mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>> {
        let prepared = self.prepare(request, true).await?;
        let upstream = prepared
            .routed
            .provider
            .generate_stream(prepared.call.clone())
            .await?;

        let sink = Arc::new(BillingSink {
            billing: self.billing.clone(),
            persistence,
            user_id: request.user_id.clone(),
            provider: prepared.routed.key.provider_name.clone(),
            model_id: prepared.routed.model.clone(),
            feature: request.feature,
            prompt: prepared.call,
        });
        Ok(self.supervisor.supervise(upstream, sink))
    }

    /// Context aggregation and prompt assembly, shared across fan-out
    /// options.
    pub(crate) async fn assemble(&self, request: &FeatureRequest) -> Result<AssembledPrompts> {
        let context = self.aggregator.aggregate(request).await;
        let resolved = self.assembler.build_prompt(request, &context).await?;
        Ok(AssembledPrompts {
            system: resolved.system_prompt,
            user: resolved.user_prompt,
        })
    }

    /// Route the request and build the outgoing call.
    pub(crate) async fn route_call(
        &self,
        request: &FeatureRequest,
        prompts: &AssembledPrompts,
        stream: bool,
    ) -> Result<PreparedCall> {
        let routed = self.router.resolve(request).await?;

        let mut call = GenerationRequest::new(
            routed.model.clone(),
            vec![Message::user(prompts.user.clone())],
        );
        if !prompts.system.is_empty() {
            call.system_prompt = Some(prompts.system.clone());
        }
        call.temperature = request.temperature.unwrap_or(self.defaults.temperature);
        call.max_tokens = Some(request.max_tokens.unwrap_or(self.defaults.max_tokens));
        call.stream = stream;

        Ok(PreparedCall { routed, call })
    }

    async fn prepare(&self, request: &FeatureRequest, stream: bool) -> Result<PreparedCall> {
        let prompts = self.assemble(request).await?;
        self.route_call(request, &prompts, stream).await
    }

    pub(crate) fn supervisor(&self) -> &StreamSupervisor {
        &self.supervisor
    }

    pub(crate) fn billing(&self) -> &Arc<BillingEngine> {
        &self.billing
    }

    async fn generate_with_retry(
        &self,
        prepared: &PreparedCall,
    ) -> std::result::Result<GenerationResponse, ProviderError> {
        let mut attempt = 1u32;
        loop {
            match prepared.routed.provider.generate(prepared.call.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.retry.max_attempts && is_transient(&err) => {
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(self.retry.retry_delay_ms)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Retry only what a fresh attempt can plausibly fix.
fn is_transient(err: &ProviderError) -> bool {
    match err {
        ProviderError::Network(_) | ProviderError::Timeout(_) | ProviderError::RateLimited { .. } => {
            true
        }
        ProviderError::ApiError { status_code, .. } => *status_code >= 500,
        _ => false,
    }
}

/// Background sink: hands the outcome to persistence, then settles billing.
pub(crate) struct BillingSink {
    pub(crate) billing: Arc<BillingEngine>,
    pub(crate) persistence: Arc<dyn CompletionSink>,
    pub(crate) user_id: String,
    pub(crate) provider: String,
    pub(crate) model_id: String,
    pub(crate) feature: FeatureType,
    pub(crate) prompt: GenerationRequest,
}

#[async_trait]
impl CompletionSink for BillingSink {
    async fn on_complete(&self, outcome: StreamOutcome) {
        self.persistence.on_complete(outcome.clone()).await;

        if outcome.full_text.is_empty()
            && matches!(outcome.ended, StreamEnd::Failed(_) | StreamEnd::HardTimeout)
        {
            debug!(user_id = %self.user_id, "stream ended before any content; nothing to bill");
            return;
        }

        let usage = match outcome.usage {
            Some(counts) => GenerationUsage::Actual(counts),
            None => GenerationUsage::estimated(&self.prompt, &outcome.full_text),
        };
        match self
            .billing
            .charge_for_request(&self.user_id, &self.provider, &self.model_id, self.feature, usage)
            .await
        {
            Ok(transaction) => {
                debug!(trace_id = %transaction.trace_id, user_id = %self.user_id, "stream billed")
            }
            Err(err) => warn!(
                user_id = %self.user_id,
                error = %err,
                "post-stream deduction failed; delivered content is not rolled back"
            ),
        }
    }
}
