//! Core domain types and collaborator traits for inkflow.
//!
//! Everything the orchestration pipeline shares lives here: the feature
//! enumeration, context selections, prompt messages, the `ModelProvider`
//! abstraction over LLM backends, and the trait seams to external
//! collaborators (content readers, template stores, the credit ledger,
//! credential storage, the novel structure reader).
//!
//! This crate has no I/O of its own.

pub mod content;
pub mod credentials;
pub mod error;
pub mod feature;
pub mod ledger;
pub mod message;
pub mod novel;
pub mod prompting;
pub mod provider;
pub mod request;
pub mod selection;

pub use content::ContentProvider;
pub use credentials::CredentialStore;
pub use error::{Error, Result};
pub use feature::FeatureType;
pub use ledger::CreditLedger;
pub use message::{Message, Role};
pub use novel::NovelReader;
pub use prompting::{FeaturePromptProvider, PromptParameters, TemplateStore};
pub use provider::ModelProvider;
pub use request::FeatureRequest;
pub use selection::{ContextKind, ContextSelection};
