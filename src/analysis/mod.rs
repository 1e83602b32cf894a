//! Scoring core.
//!
//! Score extraction from analyzer output and trust index aggregation.

pub mod aggregator;
pub mod extract;

pub use aggregator::{aggregate, AggregationConfig, OverrideRule, AGGREGATION_MODEL};
pub use extract::{extract_rationale, extract_score, first_token_symbol, first_wallet_or_tx};
