//! Fixed-sequence analysis pipeline.
//!
//! A query moves through `supervisor → phishing → transaction → rugpull →
//! aggregation`. Each analyzer adds its score, rationale and evidence to the
//! [`AnalysisRecord`]; the aggregation stage computes the trust index and
//! renders the report. No stage can fail: missing signals degrade to
//! fallback values.

mod stages;

use crate::agent::LlmHandle;
use crate::analysis::AggregationConfig;
use crate::models::{AnalysisRecord, Category, StageOutcome, TrustReport};
use crate::sources::{EvidenceSearch, FeatureSource};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A named step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Supervisor,
    Analyzer(Category),
    Aggregation,
}

impl Stage {
    /// Every stage in execution order.
    pub const SEQUENCE: [Stage; 5] = [
        Stage::Supervisor,
        Stage::Analyzer(Category::Phishing),
        Stage::Analyzer(Category::Transaction),
        Stage::Analyzer(Category::Rugpull),
        Stage::Aggregation,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Supervisor => write!(f, "supervisor"),
            Stage::Analyzer(category) => write!(f, "{}_analyzer", category),
            Stage::Aggregation => write!(f, "aggregation"),
        }
    }
}

/// Runs queries through the analyzer stages.
///
/// Collaborators are injected at construction; the pipeline itself holds no
/// per-query state, so one instance can serve concurrent queries.
pub struct Pipeline {
    llm: LlmHandle,
    search: Arc<dyn EvidenceSearch>,
    features: Arc<dyn FeatureSource>,
    aggregation: AggregationConfig,
    parallel_analyzers: bool,
}

impl Pipeline {
    pub fn new(
        llm: LlmHandle,
        search: Arc<dyn EvidenceSearch>,
        features: Arc<dyn FeatureSource>,
    ) -> Self {
        Self {
            llm,
            search,
            features,
            aggregation: AggregationConfig::default(),
            parallel_analyzers: false,
        }
    }

    pub fn with_aggregation(mut self, aggregation: AggregationConfig) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Run the three analyzers concurrently, committing their results in
    /// canonical order once all have finished.
    pub fn with_parallel_analyzers(mut self, parallel: bool) -> Self {
        self.parallel_analyzers = parallel;
        self
    }

    pub fn llm(&self) -> &LlmHandle {
        &self.llm
    }

    /// Analyze a query and return the structured result.
    pub async fn analyze(&self, query: &str) -> TrustReport {
        let mut record = self.run(query).await;
        match record.report.take() {
            Some(report) => report,
            None => self.trust_report(&record).1,
        }
    }

    /// Run every stage and return the finished record.
    pub async fn run(&self, query: &str) -> AnalysisRecord {
        info!("Analyzing query: {}", query);
        let mut record = AnalysisRecord::new(query);

        if self.parallel_analyzers {
            self.supervise(&mut record);
            let query = record.query.clone();

            debug!("Running analyzers concurrently");
            let (phishing, transaction, rugpull) = futures::join!(
                self.run_analyzer(Category::Phishing, &query),
                self.run_analyzer(Category::Transaction, &query),
                self.run_analyzer(Category::Rugpull, &query),
            );

            for outcome in [phishing, transaction, rugpull] {
                record.commit(outcome);
            }
            self.finalize(&mut record);
        } else {
            for stage in Stage::SEQUENCE {
                debug!("Entering stage {}", stage);
                match stage {
                    Stage::Supervisor => self.supervise(&mut record),
                    Stage::Analyzer(category) => {
                        let outcome = self.run_analyzer(category, &record.query).await;
                        record.commit(outcome);
                    }
                    Stage::Aggregation => self.finalize(&mut record),
                }
            }
        }

        info!(
            "Trust index {:.3} for {} categories",
            record.trust_index.unwrap_or_default(),
            record.scores.len()
        );
        record
    }

    async fn run_analyzer(&self, category: Category, query: &str) -> StageOutcome {
        let outcome = match category {
            Category::Phishing => self.phishing_stage(query).await,
            Category::Transaction => self.transaction_stage(query).await,
            Category::Rugpull => self.rugpull_stage(query).await,
        };

        debug!(
            "{} scored {:.3}{}",
            category,
            outcome.score,
            if outcome.used_fallback { " (fallback)" } else { "" }
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::{LanguageModel, LlmError};
    use crate::analysis::OverrideRule;
    use crate::models::Evidence;
    use crate::sources::{StaticFeatures, StaticSearch};
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Answers by category keyword found in the system prompt and records every call.
    struct ScriptedModel {
        phishing: &'static str,
        transaction: &'static str,
        rugpull: &'static str,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(phishing: &'static str, transaction: &'static str, rugpull: &'static str) -> Self {
            Self {
                phishing,
                transaction,
                rugpull,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl LanguageModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn analyze<'a>(
            &'a self,
            system: &'a str,
            user: &'a str,
        ) -> BoxFuture<'a, Result<String, LlmError>> {
            self.calls.lock().unwrap().push(user.to_string());
            let answer = if system.contains("PHISHING") {
                self.phishing
            } else if system.contains("RUGPULL") {
                self.rugpull
            } else {
                self.transaction
            };
            async move { Ok(answer.to_string()) }.boxed()
        }
    }

    struct FailingModel;

    impl LanguageModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        fn analyze<'a>(
            &'a self,
            _system: &'a str,
            _user: &'a str,
        ) -> BoxFuture<'a, Result<String, LlmError>> {
            async move { Err(LlmError::Connect("http://localhost:11434".to_string())) }.boxed()
        }
    }

    fn offline_pipeline() -> Pipeline {
        Pipeline::new(
            LlmHandle::Unavailable,
            Arc::new(StaticSearch),
            Arc::new(StaticFeatures),
        )
    }

    #[test]
    fn test_stage_sequence_names() {
        let names: Vec<String> = Stage::SEQUENCE.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "supervisor",
                "phishing_analyzer",
                "transaction_analyzer",
                "rugpull_analyzer",
                "aggregation"
            ]
        );
    }

    #[tokio::test]
    async fn test_offline_run_uses_fallbacks() {
        let record = offline_pipeline().run("Is USDT safe?").await;

        assert!(record.is_complete());
        assert_eq!(record.route, Category::ALL.to_vec());
        assert_eq!(record.scores[&Category::Phishing], 0.2);
        assert_eq!(record.scores[&Category::Transaction], 0.7);
        // 0.7 * 0.9 + 0.3 * 0.908
        assert!((record.scores[&Category::Rugpull] - 0.9024).abs() < 1e-9);
        assert_eq!(
            record.rationales[&Category::Transaction],
            "Transactions concentrated in few wallets."
        );
        assert_eq!(record.evidence.len(), 3);
        assert!((record.trust_index.unwrap() - 0.95).abs() < 1e-9);

        let report = record.report.unwrap();
        assert_eq!(report.trust_index, 0.95);
        assert_eq!(report.scores[&Category::Rugpull], 0.902);
        assert_eq!(report.final_report.lines().filter(|l| l.starts_with("- ")).count(), 3);
    }

    #[tokio::test]
    async fn test_identifier_extraction_and_placeholders() {
        let record = offline_pipeline()
            .run("transfer to 0xdAC17F958D2ee523a2206206994597C13D831ec7 of PEPE")
            .await;
        let identifiers: Vec<(Category, String)> = record
            .evidence
            .iter()
            .filter_map(|e| match e {
                Evidence::Features { category, features } => {
                    Some((*category, features.identifier().unwrap_or("").to_string()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            identifiers,
            vec![
                (
                    Category::Transaction,
                    "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string()
                ),
                (Category::Rugpull, "PEPE".to_string()),
            ]
        );

        let fallback = offline_pipeline().run("nothing to see here").await;
        let ids: Vec<String> = fallback
            .evidence
            .iter()
            .filter_map(|e| match e {
                Evidence::Features { features, .. } => features.identifier().map(String::from),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["unknown".to_string(), "tokenX".to_string()]);
    }

    #[tokio::test]
    async fn test_model_answers_drive_scores() {
        let model = Arc::new(ScriptedModel::new(
            "0.100\nNo phishing signals.",
            "0.300\nOrdinary transfer.",
            "0.000\nLiquidity locked for a year.",
        ));
        let pipeline = Pipeline::new(
            LlmHandle::Available(model.clone()),
            Arc::new(StaticSearch),
            Arc::new(StaticFeatures),
        );

        let record = pipeline.run("Check USDT").await;
        assert_eq!(record.scores[&Category::Phishing], 0.1);
        assert_eq!(record.scores[&Category::Transaction], 0.3);
        // blended with the 0.908 heuristic
        assert!((record.scores[&Category::Rugpull] - 0.2724).abs() < 1e-9);
        assert_eq!(record.rationales[&Category::Phishing], "No phishing signals.");

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].contains("Check USDT"));
        assert!(calls[0].contains("https://example.com"));
        assert!(calls[2].contains("Preliminary heuristic: 0.908"));
    }

    #[tokio::test]
    async fn test_unparsable_answer_is_neutral() {
        let model = ScriptedModel::new("I cannot tell.", "n/a", "unknown");
        let pipeline = Pipeline::new(
            LlmHandle::available(model),
            Arc::new(StaticSearch),
            Arc::new(StaticFeatures),
        );

        let record = pipeline.run("anything").await;
        assert_eq!(record.scores[&Category::Phishing], 0.5);
        assert_eq!(record.scores[&Category::Transaction], 0.5);
        assert!((record.scores[&Category::Rugpull] - (0.7 * 0.5 + 0.3 * 0.908)).abs() < 1e-9);
        assert_eq!(record.rationales[&Category::Phishing], "");
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_fallback() {
        let failing = Pipeline::new(
            LlmHandle::available(FailingModel),
            Arc::new(StaticSearch),
            Arc::new(StaticFeatures),
        );

        let failed = failing.analyze("Is USDT safe?").await;
        let offline = offline_pipeline().analyze("Is USDT safe?").await;
        assert_eq!(failed, offline);
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let sequential = offline_pipeline().analyze("swap ETH at 0xabcdef1234").await;
        let parallel = offline_pipeline()
            .with_parallel_analyzers(true)
            .analyze("swap ETH at 0xabcdef1234")
            .await;
        assert_eq!(sequential, parallel);
    }

    #[tokio::test]
    async fn test_custom_aggregation_config() {
        let lenient = AggregationConfig {
            weights: BTreeMap::from([
                (Category::Phishing, 0.0),
                (Category::Transaction, 0.0),
                (Category::Rugpull, 0.0),
            ]),
            overrides: vec![OverrideRule::new(Category::Phishing, 0.1, 0.4)],
        };
        let report = offline_pipeline()
            .with_aggregation(lenient)
            .analyze("Is USDT safe?")
            .await;
        assert_eq!(report.trust_index, 0.4);
    }

    #[tokio::test]
    async fn test_fixture_features_feed_heuristic() {
        let fixtures = crate::sources::FixtureFeatures::from_json(
            r#"{"SAFE": {"holders_top10": 0.15, "lp_locked_days": 180, "age_days": 250}}"#,
        )
        .unwrap();
        let pipeline = Pipeline::new(
            LlmHandle::Unavailable,
            Arc::new(StaticSearch),
            Arc::new(fixtures),
        );

        let record = pipeline.run("Is SAFE a rugpull?").await;
        // 0.7 * 0.9 + 0.3 * 0.12
        assert!((record.scores[&Category::Rugpull] - 0.666).abs() < 1e-9);
        assert!(matches!(
            record.evidence.last(),
            Some(Evidence::Features { features, .. }) if features.identifier() == Some("SAFE")
        ));
    }

    #[test]
    fn test_unfinalized_record_reports_real_index() {
        let pipeline = offline_pipeline();
        let mut record = tokio_test::block_on(pipeline.run("Is USDT safe?"));
        let finalized = record.report.take().unwrap();

        let (trust_index, rebuilt) = pipeline.trust_report(&record);
        assert!((trust_index - 0.95).abs() < 1e-9);
        assert_eq!(rebuilt, finalized);
    }

    #[test]
    fn test_partial_record_still_aggregates() {
        let pipeline = offline_pipeline();
        let mut record = AnalysisRecord::new("partial");
        pipeline.supervise(&mut record);
        record.commit(tokio_test::block_on(pipeline.rugpull_stage("partial")));
        pipeline.finalize(&mut record);

        assert!(!record.is_complete());
        // rugpull alone at 0.9024 crosses its override
        assert_eq!(record.report.unwrap().trust_index, 0.95);
    }

    #[test]
    fn test_independent_queries_do_not_share_state() {
        let pipeline = offline_pipeline();
        let first = tokio_test::block_on(pipeline.run("first USDT"));
        let second = tokio_test::block_on(pipeline.run("second"));
        assert_eq!(first.evidence.len(), 3);
        assert_eq!(second.evidence.len(), 3);
        assert_eq!(second.query, "second");
    }
}
