//! Containment-aware context deduplication and aggregation.
//!
//! The aggregator takes the caller's raw context selections, removes
//! structurally redundant ones using a per-novel containment index, and
//! concatenates the surviving content into one context string.

pub mod aggregator;
pub mod containment;
pub mod registry;

pub use aggregator::ContextAggregator;
pub use containment::{ContainmentCache, ContainmentIndex};
pub use registry::ContentProviderRegistry;
