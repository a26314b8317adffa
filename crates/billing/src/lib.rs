//! Usage-based credit billing for inkflow.
//!
//! Every completed generation is charged exactly once. When the provider
//! reports real token counts we bill those; when it does not (interrupted
//! streams, vendors that omit usage) we fall back to a character-based
//! estimate and mark the transaction accordingly. A failed deduction fails
//! the request — there is no retry and no second transaction.

pub mod engine;
pub mod estimate;
pub mod transaction;

pub use engine::BillingEngine;
pub use estimate::{Estimator, GenerationUsage};
pub use transaction::{BillingMode, TransactionStatus, UsageTransaction};
