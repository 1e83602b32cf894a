//! Stage implementations for [`Pipeline`].

use super::Pipeline;
use crate::agent::prompts;
use crate::analysis::{
    aggregate, extract_rationale, extract_score, first_token_symbol, first_wallet_or_tx,
};
use crate::models::{clamp_score, AnalysisRecord, Category, Evidence, StageOutcome, TrustReport};
use crate::report::build_report;
use crate::sources::estimate_risk;
use tracing::{debug, warn};

/// Identifier used when the query holds no address or transaction hash.
const UNKNOWN_WALLET: &str = "unknown";

/// Identifier used when the query holds no token symbol.
const UNKNOWN_TOKEN: &str = "tokenX";

const LLM_BLEND: f64 = 0.7;
const HEURISTIC_BLEND: f64 = 0.3;

/// A model answer, or the category's canned answer when none is available.
struct Answer {
    text: String,
    used_fallback: bool,
}

impl Pipeline {
    pub(super) fn supervise(&self, record: &mut AnalysisRecord) {
        record.reset(&Category::ALL);
    }

    pub(super) async fn phishing_stage(&self, query: &str) -> StageOutcome {
        let category = Category::Phishing;
        let results = self.search.search(query);
        let evidence = Evidence::SearchResults { results };

        let prompt = prompts::phishing_prompt(query, &evidence.to_string());
        let answer = self.consult(category, &prompt).await;

        StageOutcome {
            category,
            score: extract_score(&answer.text),
            rationale: extract_rationale(&answer.text).to_string(),
            evidence,
            used_fallback: answer.used_fallback,
        }
    }

    pub(super) async fn transaction_stage(&self, query: &str) -> StageOutcome {
        let category = Category::Transaction;
        let identifier = first_wallet_or_tx(query).unwrap_or(UNKNOWN_WALLET);
        let features = self.features.fetch_features(identifier);

        let prompt = prompts::transaction_prompt(&features);
        let answer = self.consult(category, &prompt).await;

        StageOutcome {
            category,
            score: extract_score(&answer.text),
            rationale: extract_rationale(&answer.text).to_string(),
            evidence: Evidence::Features { category, features },
            used_fallback: answer.used_fallback,
        }
    }

    /// Blends the model score with the heuristic estimate, 70/30.
    pub(super) async fn rugpull_stage(&self, query: &str) -> StageOutcome {
        let category = Category::Rugpull;
        let identifier = first_token_symbol(query).unwrap_or(UNKNOWN_TOKEN);
        let features = self.features.fetch_features(identifier);
        let heuristic = estimate_risk(&features);

        let prompt = prompts::rugpull_prompt(&features, heuristic);
        let answer = self.consult(category, &prompt).await;

        let model_score = extract_score(&answer.text);
        let score = clamp_score(LLM_BLEND * model_score + HEURISTIC_BLEND * heuristic);
        debug!(
            "rugpull blend: model {:.3}, heuristic {:.3} -> {:.3}",
            model_score, heuristic, score
        );

        StageOutcome {
            category,
            score,
            rationale: extract_rationale(&answer.text).to_string(),
            evidence: Evidence::Features { category, features },
            used_fallback: answer.used_fallback,
        }
    }

    /// Computes the trust index and renders the report into the record.
    pub(super) fn finalize(&self, record: &mut AnalysisRecord) {
        if !record.is_complete() {
            warn!(
                "Aggregating {} of {} categories",
                record.scores.len(),
                record.route.len()
            );
        }

        let (trust_index, report) = self.trust_report(record);
        record.trust_index = Some(trust_index);
        record.report = Some(report);
    }

    /// Aggregates whatever the record holds into the unrounded index and its report.
    pub(super) fn trust_report(&self, record: &AnalysisRecord) -> (f64, TrustReport) {
        let trust_index = aggregate(&record.scores, &self.aggregation);
        let (_, report) = build_report(
            trust_index,
            &record.scores,
            &record.rationales,
            &record.evidence,
        );
        (trust_index, report)
    }

    async fn consult(&self, category: Category, prompt: &str) -> Answer {
        let system = prompts::system_prompt(category);

        match self.llm.consult(category, &system, prompt).await {
            Some(text) => Answer {
                text: text.trim().to_string(),
                used_fallback: false,
            },
            None => Answer {
                text: prompts::fallback_response(category).to_string(),
                used_fallback: true,
            },
        }
    }
}
