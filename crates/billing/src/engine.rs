//! The billing engine — one charge per completed generation.
//!
//! The engine resolves usage to token counts, asks the ledger for exactly
//! one deduction, and records a transaction either way. It never retries:
//! a declined deduction fails the request, and a post-stream decline (the
//! content already reached the user) is recorded as a failed transaction
//! without rolling the content back.

use crate::estimate::{Estimator, GenerationUsage};
use crate::transaction::{BillingMode, TransactionStatus, UsageTransaction};
use inkflow_config::BillingConfig;
use inkflow_core::error::BillingError;
use inkflow_core::feature::FeatureType;
use inkflow_core::ledger::CreditLedger;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub struct BillingEngine {
    ledger: Arc<dyn CreditLedger>,
    estimator: Estimator,
    /// Completed and failed transactions, newest last.
    transactions: RwLock<Vec<UsageTransaction>>,
}

impl BillingEngine {
    pub fn new(ledger: Arc<dyn CreditLedger>, config: &BillingConfig) -> Self {
        Self::with_estimator(ledger, Estimator::from(config))
    }

    pub fn with_estimator(ledger: Arc<dyn CreditLedger>, estimator: Estimator) -> Self {
        Self {
            ledger,
            estimator,
            transactions: RwLock::new(Vec::new()),
        }
    }

    /// Charge for one completed generation.
    ///
    /// Returns the recorded transaction on success. A declined deduction
    /// records a failed transaction and returns `InsufficientCredits`; an
    /// unreachable ledger returns its error with nothing recorded, since
    /// no deduction attempt reached the books.
    pub async fn charge_for_request(
        &self,
        user_id: &str,
        provider: &str,
        model_id: &str,
        feature: FeatureType,
        usage: GenerationUsage,
    ) -> std::result::Result<UsageTransaction, BillingError> {
        let billing_mode = if usage.is_estimated() {
            BillingMode::Estimated
        } else {
            BillingMode::Actual
        };
        let (input_tokens, output_tokens) = self.estimator.resolve(&usage, feature);

        let outcome = self
            .ledger
            .deduct_for_ai(user_id, provider, model_id, feature, input_tokens, output_tokens)
            .await?;

        if !outcome.success {
            let reason = outcome.message.unwrap_or_else(|| "deduction declined".into());
            warn!(
                user_id,
                provider,
                model_id,
                feature = feature.as_str(),
                input_tokens,
                output_tokens,
                %reason,
                "credit deduction declined"
            );
            self.record(UsageTransaction::new(
                user_id,
                provider,
                model_id,
                feature,
                input_tokens,
                output_tokens,
                0.0,
                billing_mode,
                TransactionStatus::Failed,
            ));
            return Err(BillingError::DeductionFailed {
                user_id: user_id.to_string(),
                message: reason,
            });
        }

        let transaction = UsageTransaction::new(
            user_id,
            provider,
            model_id,
            feature,
            input_tokens,
            output_tokens,
            outcome.credits_deducted,
            billing_mode,
            TransactionStatus::Completed,
        );
        info!(
            trace_id = %transaction.trace_id,
            user_id,
            provider,
            model_id,
            feature = feature.as_str(),
            input_tokens,
            output_tokens,
            credits = outcome.credits_deducted,
            mode = ?billing_mode,
            "usage charged"
        );
        self.record(transaction.clone());
        Ok(transaction)
    }

    fn record(&self, transaction: UsageTransaction) {
        self.transactions.write().unwrap().push(transaction);
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.read().unwrap().len()
    }

    /// The most recent transactions, newest first.
    pub fn recent_transactions(&self, limit: usize) -> Vec<UsageTransaction> {
        let all = self.transactions.read().unwrap();
        all.iter().rev().take(limit).cloned().collect()
    }

    pub fn transactions_for_user(&self, user_id: &str) -> Vec<UsageTransaction> {
        self.transactions
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}
