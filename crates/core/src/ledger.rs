//! Credit ledger trait — the billing side's external collaborator.
//!
//! The ledger owns balances and the deduction write. The billing engine
//! never retries a failed deduction; a failure fails the whole request.

use crate::error::BillingError;
use crate::feature::FeatureType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The outcome of one deduction attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionOutcome {
    /// Whether the deduction was applied.
    pub success: bool,
    /// Credits actually deducted (0.0 on failure).
    pub credits_deducted: f64,
    /// Human-readable detail, e.g. the insufficient-balance reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeductionOutcome {
    pub fn applied(credits: f64) -> Self {
        Self {
            success: true,
            credits_deducted: credits,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            credits_deducted: 0.0,
            message: Some(message.into()),
        }
    }
}

/// Deducts usage credits for AI calls.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Deduct credits for one completed AI request.
    ///
    /// `Err` means the ledger itself was unreachable; a reachable ledger
    /// that declines returns `Ok` with `success == false`.
    async fn deduct_for_ai(
        &self,
        user_id: &str,
        provider: &str,
        model_id: &str,
        feature: FeatureType,
        input_tokens: u64,
        output_tokens: u64,
    ) -> std::result::Result<DeductionOutcome, BillingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_constructors() {
        let ok = DeductionOutcome::applied(1.25);
        assert!(ok.success);
        assert!((ok.credits_deducted - 1.25).abs() < 1e-10);

        let no = DeductionOutcome::rejected("insufficient balance");
        assert!(!no.success);
        assert_eq!(no.credits_deducted, 0.0);
        assert_eq!(no.message.as_deref(), Some("insufficient balance"));
    }
}
