//! Trust report construction.
//!
//! Turns the aggregate and the per-category results into the human-readable
//! summary and the structured [`TrustReport`]. Pure: no I/O, no clock.

use crate::analysis::AGGREGATION_MODEL;
use crate::models::{clamp_score, round3, Category, Evidence, TrustReport};
use std::collections::BTreeMap;

/// Build the human-readable summary and the structured result.
///
/// One bullet is rendered per category present in `scores`, in canonical
/// category order.
pub fn build_report(
    trust_index: f64,
    scores: &BTreeMap<Category, f64>,
    rationales: &BTreeMap<Category, String>,
    evidence: &[Evidence],
) -> (String, TrustReport) {
    let trust_index = clamp_score(trust_index);

    let bullets: Vec<String> = scores
        .iter()
        .map(|(category, score)| {
            format!(
                "- {}: {:.3} - {}",
                category.title(),
                score,
                rationales.get(category).map(String::as_str).unwrap_or("")
            )
        })
        .collect();

    let text = format!(
        "Trust Index: {:.3} (0 = safe, 1 = high risk)\n\n{}",
        trust_index,
        bullets.join("\n")
    );

    let report = TrustReport {
        trust_index: round3(trust_index),
        scores: scores.iter().map(|(c, s)| (*c, round3(*s))).collect(),
        rationales: rationales.clone(),
        evidence: evidence.to_vec(),
        aggregation_model: AGGREGATION_MODEL.to_string(),
        final_report: text.clone(),
    };

    (text, report)
}
