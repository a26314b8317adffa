//! Silence watchdog and cancellation decoupling.
//!
//! Two tasks joined by a buffered channel: the generation side owns the
//! upstream provider stream and is never cancelled by the caller; the
//! delivery side is the receiver handed back to the caller, who may drop
//! it at any time. The generation side accumulates the full text and hands
//! it to a `CompletionSink` whichever way the stream ends, so persistence
//! and billing survive a disconnected client.

use async_trait::async_trait;
use inkflow_config::StreamingConfig;
use inkflow_core::error::ProviderError;
use inkflow_core::provider::{StreamChunk, Usage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, warn};

type ChunkResult = std::result::Result<StreamChunk, ProviderError>;

/// How the upstream generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// Upstream completed (terminal chunk or channel close).
    Completed,
    /// Upstream reported an error.
    Failed(String),
    /// The hard overall timeout expired; upstream was abandoned.
    HardTimeout,
}

/// The generation side's final accounting for one stream.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// All content received from upstream, in order.
    pub full_text: String,
    /// Usage from the terminal chunk, when the vendor reported it.
    pub usage: Option<Usage>,
    pub ended: StreamEnd,
    /// Whether the silence watchdog cut the consumer off before upstream
    /// finished. The full text is still complete up to `ended`.
    pub silence_fired: bool,
}

/// Receives the accumulated stream once generation ends. Implementations
/// persist the message and settle billing; the consumer may be long gone.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn on_complete(&self, outcome: StreamOutcome);
}

/// Sink that drops the outcome. For callers that persist elsewhere.
pub struct NoopSink;

#[async_trait]
impl CompletionSink for NoopSink {
    async fn on_complete(&self, _outcome: StreamOutcome) {}
}

/// Supervises provider streams according to the configured knobs.
#[derive(Clone)]
pub struct StreamSupervisor {
    config: StreamingConfig,
}

impl StreamSupervisor {
    pub fn new(config: StreamingConfig) -> Self {
        Self { config }
    }

    /// Wrap an upstream provider stream.
    ///
    /// The returned receiver surfaces exactly one terminal event: the
    /// upstream terminal chunk, an upstream error, a synthetic end marker
    /// on silence timeout, or a timeout error on hard timeout — whichever
    /// fires first. Dropping the receiver never cancels upstream.
    pub fn supervise(
        &self,
        upstream: mpsc::Receiver<ChunkResult>,
        sink: Arc<dyn CompletionSink>,
    ) -> mpsc::Receiver<ChunkResult> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let config = self.config.clone();
        tokio::spawn(async move {
            let outcome = run(upstream, tx, &config).await;
            sink.on_complete(outcome).await;
        });
        rx
    }
}

async fn run(
    mut upstream: mpsc::Receiver<ChunkResult>,
    tx: mpsc::Sender<ChunkResult>,
    config: &StreamingConfig,
) -> StreamOutcome {
    let started = Instant::now();
    let hard_deadline = started + Duration::from_secs(config.hard_timeout_secs);
    let grace = Duration::from_secs(config.grace_period_secs);
    let silence = Duration::from_secs(config.silence_timeout_secs);

    let mut ticker = tokio::time::interval(Duration::from_millis(config.watchdog_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // `None` once the terminal event has been surfaced (or the consumer
    // dropped the receiver). Upstream draining continues regardless.
    let mut delivery = Some(tx);
    let mut last_content = started;
    let mut full_text = String::new();
    let mut usage: Option<Usage> = None;
    let mut silence_fired = false;

    let ended = loop {
        tokio::select! {
            received = upstream.recv() => {
                match received {
                    Some(Ok(chunk)) => {
                        if chunk.is_content() {
                            last_content = Instant::now();
                            full_text.push_str(chunk.content.as_deref().unwrap_or(""));
                        }
                        if chunk.done {
                            usage = chunk.usage.or(usage);
                            send_terminal(&mut delivery, Ok(chunk)).await;
                            break StreamEnd::Completed;
                        }
                        send(&mut delivery, Ok(chunk)).await;
                    }
                    Some(Err(err)) => {
                        let message = err.to_string();
                        warn!(error = %message, "upstream stream failed");
                        send_terminal(&mut delivery, Err(err)).await;
                        break StreamEnd::Failed(message);
                    }
                    None => {
                        // Upstream closed without a terminal chunk.
                        send_terminal(&mut delivery, Ok(StreamChunk::done(None))).await;
                        break StreamEnd::Completed;
                    }
                }
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                if now >= hard_deadline {
                    warn!(
                        elapsed_secs = started.elapsed().as_secs(),
                        "hard stream timeout; abandoning upstream"
                    );
                    send_terminal(
                        &mut delivery,
                        Err(ProviderError::Timeout("hard stream timeout exceeded".into())),
                    )
                    .await;
                    break StreamEnd::HardTimeout;
                }
                if !silence_fired
                    && delivery.is_some()
                    && started.elapsed() >= grace
                    && now.duration_since(last_content) >= silence
                {
                    silence_fired = true;
                    warn!(
                        silent_secs = now.duration_since(last_content).as_secs(),
                        "silence timeout; ending consumer stream, generation continues"
                    );
                    send_terminal(&mut delivery, Ok(StreamChunk::done(None))).await;
                }
            }
        }
    };

    debug!(
        chars = full_text.len(),
        ?ended,
        silence_fired,
        "stream supervision finished"
    );
    StreamOutcome {
        full_text,
        usage,
        ended,
        silence_fired,
    }
}

/// Adapt a supervised receiver into a `Stream` for combinator-style
/// consumers (HTTP layers, SSE adapters).
pub fn into_stream(
    rx: mpsc::Receiver<ChunkResult>,
) -> tokio_stream::wrappers::ReceiverStream<ChunkResult> {
    tokio_stream::wrappers::ReceiverStream::new(rx)
}

async fn send(delivery: &mut Option<mpsc::Sender<ChunkResult>>, item: ChunkResult) {
    if let Some(tx) = delivery
        && tx.send(item).await.is_err()
    {
        // Consumer dropped the receiver. Generation keeps going.
        *delivery = None;
    }
}

async fn send_terminal(delivery: &mut Option<mpsc::Sender<ChunkResult>>, item: ChunkResult) {
    if let Some(tx) = delivery.take() {
        let _ = tx.send(item).await;
    }
}
