//! Trust index aggregation.
//!
//! Per-category scores are combined with a weighted Noisy-OR, then raised
//! to a floor whenever a critical category crosses its override threshold.

use crate::models::{clamp_score, Category};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name reported alongside every trust index.
pub const AGGREGATION_MODEL: &str = "Noisy-OR Weighted + Overrides";

/// Weight applied to a scored category that has no configured weight.
pub const UNLISTED_WEIGHT: f64 = 1.0;

/// Forces the aggregate up to `floor` when `category` scores at least `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub category: Category,
    pub threshold: f64,
    pub floor: f64,
}

impl OverrideRule {
    pub fn new(category: Category, threshold: f64, floor: f64) -> Self {
        Self {
            category,
            threshold,
            floor,
        }
    }
}

/// Weights and override rules used by [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    pub weights: BTreeMap<Category, f64>,
    pub overrides: Vec<OverrideRule>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            overrides: default_overrides(),
        }
    }
}

impl AggregationConfig {
    /// Effective weight for a category. Negative or NaN weights count as 0.
    pub fn weight(&self, category: Category) -> f64 {
        self.weights
            .get(&category)
            .copied()
            .unwrap_or(UNLISTED_WEIGHT)
            .max(0.0)
    }
}

/// phishing 0.95, transaction 0.75, rugpull 0.85.
pub fn default_weights() -> BTreeMap<Category, f64> {
    BTreeMap::from([
        (Category::Phishing, 0.95),
        (Category::Transaction, 0.75),
        (Category::Rugpull, 0.85),
    ])
}

pub fn default_overrides() -> Vec<OverrideRule> {
    vec![
        OverrideRule::new(Category::Phishing, 0.90, 0.98),
        OverrideRule::new(Category::Rugpull, 0.90, 0.95),
        OverrideRule::new(Category::Transaction, 0.90, 0.95),
    ]
}

/// Combine per-category scores into a single trust index in [0, 1].
///
/// Categories absent from `scores` contribute no risk, both to the Noisy-OR
/// product and to the override checks. The result is non-decreasing in every
/// input score and independent of iteration order.
pub fn aggregate(scores: &BTreeMap<Category, f64>, config: &AggregationConfig) -> f64 {
    let product = scores.iter().fold(1.0, |product, (category, score)| {
        let term = (1.0 - config.weight(*category) * clamp_score(*score)).max(0.0);
        product * term
    });
    let base = 1.0 - product;

    let floored = config
        .overrides
        .iter()
        .filter(|rule| {
            let score = scores.get(&rule.category).copied().map(clamp_score);
            score.unwrap_or(0.0) >= rule.threshold
        })
        .fold(base, |acc, rule| acc.max(rule.floor));

    clamp_score(floored)
}
