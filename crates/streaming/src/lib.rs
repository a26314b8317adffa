//! Streaming resilience for inkflow.
//!
//! Wraps a provider's chunk stream with a silence watchdog and a hard
//! timeout, decouples caller cancellation from upstream generation so the
//! full text can still be persisted, and — for multi-option outline
//! generation — extracts a structured title before forwarding content.

pub mod extract;
pub mod resilience;

pub use extract::{ExtractedChunk, StructuredExtractor};
pub use resilience::{
    into_stream, CompletionSink, NoopSink, StreamEnd, StreamOutcome, StreamSupervisor,
};
