//! Usage transaction records.
//!
//! One record per charge attempt, tagged with whether the token counts
//! were vendor-reported or estimated, and whether the deduction applied.

use chrono::{DateTime, Utc};
use inkflow_core::feature::FeatureType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the token counts on a transaction were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillingMode {
    /// Counts reported by the provider.
    Actual,
    /// Counts derived from character-based estimation.
    Estimated,
}

/// Whether the deduction behind a transaction went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

/// An auditable record of one billed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageTransaction {
    pub trace_id: String,
    pub user_id: String,
    pub provider: String,
    pub model_id: String,
    pub feature: FeatureType,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub credits_deducted: f64,
    pub billing_mode: BillingMode,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl UsageTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: impl Into<String>,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        feature: FeatureType,
        input_tokens: u64,
        output_tokens: u64,
        credits_deducted: f64,
        billing_mode: BillingMode,
        status: TransactionStatus,
    ) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            provider: provider.into(),
            model_id: model_id.into(),
            feature,
            input_tokens,
            output_tokens,
            credits_deducted,
            billing_mode,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
