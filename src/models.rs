//! Data models for the risk orchestrator.
//!
//! This module contains the core data structures threaded through the
//! pipeline: risk categories, evidence, the per-query analysis record and
//! the structured trust report returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Score used whenever a value cannot be read or is not a number.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Clamp a raw value into the closed score interval [0, 1].
///
/// NaN has no meaningful position in the interval and maps to
/// [`NEUTRAL_SCORE`].
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        NEUTRAL_SCORE
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Round a score to three decimal places for presentation.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// A risk dimension analyzed by the pipeline.
///
/// Declaration order is the canonical route order, so ordered maps keyed by
/// `Category` iterate phishing, transaction, rugpull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Phishing,
    Transaction,
    Rugpull,
}

impl Category {
    /// Every category, in canonical route order.
    pub const ALL: [Category; 3] = [Category::Phishing, Category::Transaction, Category::Rugpull];

    /// Lowercase identifier, as used in config files and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Phishing => "phishing",
            Category::Transaction => "transaction",
            Category::Rugpull => "rugpull",
        }
    }

    /// Capitalized name for human-readable reports.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Phishing => "Phishing",
            Category::Transaction => "Transaction",
            Category::Rugpull => "Rugpull",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "phishing" => Ok(Category::Phishing),
            "transaction" => Ok(Category::Transaction),
            "rugpull" | "rug_pull" | "rug-pull" => Ok(Category::Rugpull),
            other => Err(format!("unknown risk category: {}", other)),
        }
    }
}

/// Qualitative band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Low below 0.33, medium below 0.66, high otherwise.
    pub fn from_score(score: f64) -> Self {
        let score = clamp_score(score);
        if score < 0.33 {
            RiskLevel::Low
        } else if score < 0.66 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Medium => "🟡",
            RiskLevel::High => "🔴",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// A single hit returned by an evidence search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Named attributes describing a wallet, transaction or token.
///
/// Values are kept as JSON so both numeric (`holders_top10`) and textual
/// (`identifier`) attributes fit in one mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(BTreeMap<String, Value>);

impl Features {
    /// Creates a feature set carrying only its identifier.
    pub fn new(identifier: &str) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("identifier".to_string(), Value::from(identifier));
        Self(attributes)
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    #[cfg(test)]
    pub fn identifier(&self) -> Option<&str> {
        self.0.get("identifier").and_then(Value::as_str)
    }

    /// Numeric attribute, if present and numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// Supporting material appended by an analyzer stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// Search hits gathered for the phishing analysis.
    SearchResults { results: Vec<WebResult> },
    /// Attributes fetched for an on-chain analysis.
    Features {
        category: Category,
        features: Features,
    },
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::SearchResults { results } => {
                let lines: Vec<String> = results
                    .iter()
                    .map(|r| format!("- {} | {} | {}", r.title, r.url, r.snippet))
                    .collect();
                write!(f, "{}", lines.join("\n"))
            }
            Evidence::Features { features, .. } => write!(f, "{}", features),
        }
    }
}

/// What a single analyzer stage produced for its category.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub category: Category,
    pub score: f64,
    pub rationale: String,
    pub evidence: Evidence,
    /// True when the fixed fallback response stood in for the model.
    pub used_fallback: bool,
}

/// The accumulating per-query state threaded through the pipeline.
///
/// Created once per query, extended by each stage and dropped after the
/// report is returned.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRecord {
    /// Original query.
    pub query: String,
    /// Canonical category set; informational only, never drives control flow.
    pub route: Vec<Category>,
    pub scores: BTreeMap<Category, f64>,
    pub rationales: BTreeMap<Category, String>,
    /// Appended by every analyzer, never removed.
    pub evidence: Vec<Evidence>,
    pub trust_index: Option<f64>,
    pub report: Option<TrustReport>,
}

impl AnalysisRecord {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }

    /// Clears accumulated results and installs the route, keeping the query.
    pub fn reset(&mut self, route: &[Category]) {
        self.route = route.to_vec();
        self.scores.clear();
        self.rationales.clear();
        self.evidence.clear();
        self.trust_index = None;
        self.report = None;
    }

    /// Writes a stage outcome into the record.
    pub fn commit(&mut self, outcome: StageOutcome) {
        self.scores
            .insert(outcome.category, clamp_score(outcome.score));
        self.rationales.insert(outcome.category, outcome.rationale);
        self.evidence.push(outcome.evidence);
    }

    /// True when every routed category has exactly one score and rationale.
    pub fn is_complete(&self) -> bool {
        self.scores.len() == self.route.len()
            && self.rationales.len() == self.route.len()
            && self
                .route
                .iter()
                .all(|c| self.scores.contains_key(c) && self.rationales.contains_key(c))
    }
}

/// The structured result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustReport {
    /// Aggregate score, rounded to three decimals.
    pub trust_index: f64,
    /// Per-category scores, rounded to three decimals.
    pub scores: BTreeMap<Category, f64>,
    pub rationales: BTreeMap<Category, String>,
    pub evidence: Vec<Evidence>,
    pub aggregation_model: String,
    /// Human-readable rendering of the above.
    pub final_report: String,
}

impl TrustReport {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.trust_index)
    }
}

const UNKNOWN_FIELD: &str = "unknown";

/// A transaction submitted for analysis instead of a free-text query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionInput {
    #[serde(default)]
    pub token_symbol: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl TransactionInput {
    /// Renders the transaction as the sentence the analyzers read.
    ///
    /// Missing or blank fields read as `unknown`.
    pub fn to_query(&self) -> String {
        let text = |v: &Option<String>| match v.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => UNKNOWN_FIELD.to_string(),
        };
        let amount = match &self.amount {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::String(_)) | Some(Value::Null) | None => UNKNOWN_FIELD.to_string(),
            Some(other) => other.to_string(),
        };

        format!(
            "Analyze token {} {} in the transaction from {} to {} with amount {}. Type: {}.",
            text(&self.token_symbol),
            text(&self.token_address),
            text(&self.from_address),
            text(&self.to_address),
            amount,
            text(&self.kind),
        )
    }
}

/// Metadata about one run of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub query: String,
    pub analysis_date: DateTime<Utc>,
    /// Name of the language model consulted, `None` when running offline.
    pub model_used: Option<String>,
    pub llm_available: bool,
    pub duration_seconds: f64,
    /// Caller-supplied context, carried through untouched.
    #[serde(default)]
    pub context: Value,
}

/// Everything written out by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub metadata: RunMetadata,
    pub result: TrustReport,
}
