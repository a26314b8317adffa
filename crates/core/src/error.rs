//! Error types for the inkflow domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all inkflow operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider / routing errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Context aggregation errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Prompt assembly errors ---
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    // --- Billing errors ---
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Public model config '{config_id}' is disabled")]
    ConfigDisabled { config_id: String },

    #[error("Feature '{feature}' is not enabled for public model config '{config_id}'")]
    FeatureNotEnabled { feature: String, config_id: String },

    #[error("Credential resolution failed for owner '{owner_id}': {reason}")]
    CredentialResolution { owner_id: String, reason: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("Novel structure unavailable for '{novel_id}': {reason}")]
    StructureUnavailable { novel_id: String, reason: String },

    #[error("Content read failed for {kind} '{id}': {reason}")]
    ReadFailed {
        kind: String,
        id: String,
        reason: String,
    },

    #[error("No content provider registered for kind '{0}'")]
    UnknownKind(String),
}

#[derive(Debug, Clone, Error)]
pub enum PromptError {
    #[error("Unknown feature type: {0}")]
    UnknownFeature(String),

    #[error("No prompt provider registered for feature '{0}'")]
    ProviderMissing(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template store error: {0}")]
    Store(String),

    #[error("Prompt rendering failed: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Error)]
pub enum BillingError {
    #[error("Credit deduction failed for user '{user_id}': {message}")]
    DeductionFailed { user_id: String, message: String },

    #[error("Insufficient credits for user '{user_id}': {message}")]
    InsufficientCredits { user_id: String, message: String },

    #[error("Credit ledger unavailable: {0}")]
    LedgerUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn feature_gating_error_names_the_feature() {
        let err = Error::Provider(ProviderError::FeatureNotEnabled {
            feature: "outline_generation".into(),
            config_id: "pub-1".into(),
        });
        assert!(err.to_string().contains("outline_generation"));
        assert!(err.to_string().contains("pub-1"));
    }

    #[test]
    fn billing_error_displays_correctly() {
        let err = Error::Billing(BillingError::InsufficientCredits {
            user_id: "u-1".into(),
            message: "balance 0.2, needed 1.4".into(),
        });
        assert!(err.to_string().contains("u-1"));
        assert!(err.to_string().contains("needed 1.4"));
    }
}
