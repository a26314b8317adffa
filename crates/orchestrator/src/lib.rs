//! The inkflow request orchestrator.
//!
//! Wires the pipeline end to end: context aggregation → prompt assembly →
//! provider routing → generation → billing. Streaming requests return a
//! supervised chunk stream with billing settled in the background; outline
//! generation fans out N independent options.

pub mod outline;
pub mod pipeline;
pub mod telemetry;

pub use outline::OutlineOption;
pub use pipeline::{CompletedGeneration, RequestOrchestrator};
pub use telemetry::init_tracing;
