//! Prompt template resolution and parameter assembly.
//!
//! The assembler resolves which template to use (explicit override → user
//! default → built-in default), builds one shared parameter map per
//! request, and produces the final system/user prompt pair, optionally
//! with a machine-parseable output-format suffix.

pub mod assembler;
pub mod format;
pub mod preset;

pub use assembler::{PromptAssembler, ResolvedTemplate};
pub use format::{output_format_suffix, OutputMode};
pub use preset::{config_hash, PresetStore, PromptPreset};
