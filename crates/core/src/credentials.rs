//! Credential store trait.
//!
//! Stored keys are opaque to the core; decryption happens behind this
//! seam. The router calls it once per provider-cache miss.

use crate::error::ProviderError;
use async_trait::async_trait;

/// Resolves a user's stored, encrypted API key to plaintext.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Decrypt the stored key for `(owner, provider)`.
    async fn decrypt_key(
        &self,
        owner_id: &str,
        provider_name: &str,
    ) -> std::result::Result<String, ProviderError>;
}
