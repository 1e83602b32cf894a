//! Report rendering for the CLI.
//!
//! This module renders an [`AnalysisOutput`] as plain text, Markdown or JSON.

use crate::models::{AnalysisOutput, Evidence, RiskLevel, RunMetadata, TrustReport};
use anyhow::{Context, Result};
use std::path::Path;

/// Plain-text rendering: the report summary produced by the pipeline.
pub fn generate_text_report(output: &AnalysisOutput) -> String {
    let mut text = output.result.final_report.clone();
    text.push('\n');
    text
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(output: &AnalysisOutput) -> String {
    let mut markdown = String::new();

    markdown.push_str("# VETRA Risk Report\n\n");
    markdown.push_str(&generate_metadata_section(&output.metadata));
    markdown.push_str(&generate_summary_section(&output.result));
    markdown.push_str(&generate_categories_section(&output.result));
    markdown.push_str(&generate_evidence_section(&output.result.evidence));
    markdown.push_str(&generate_footer(&output.result));

    markdown
}

/// Generate a JSON report.
pub fn generate_json_report(output: &AnalysisOutput) -> Result<String> {
    serde_json::to_string_pretty(output).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Query:** {}\n", metadata.query));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    match &metadata.model_used {
        Some(model) => section.push_str(&format!("- **Model Used:** `{}`\n", model)),
        None => section.push_str("- **Model Used:** offline (fallback answers)\n"),
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_summary_section(result: &TrustReport) -> String {
    let level = result.level();
    let mut section = String::new();

    section.push_str("## Trust Index\n\n");
    section.push_str(&format!(
        "**{:.3}** {} {} risk *(0 = safe, 1 = high risk)*\n\n",
        result.trust_index,
        level.emoji(),
        level
    ));

    section
}

fn generate_categories_section(result: &TrustReport) -> String {
    let mut section = String::new();

    section.push_str("## Risk by Category\n\n");

    if result.scores.is_empty() {
        section.push_str("No category was scored.\n\n");
        return section;
    }

    section.push_str("| Category | Score | Level | Rationale |\n");
    section.push_str("|:---|:---:|:---:|:---|\n");

    for (category, score) in &result.scores {
        let level = RiskLevel::from_score(*score);
        let rationale = result
            .rationales
            .get(category)
            .map(|r| r.replace('\n', " ").replace('|', "\\|"))
            .unwrap_or_default();

        section.push_str(&format!(
            "| {} | {:.3} | {} {} | {} |\n",
            category.title(),
            score,
            level.emoji(),
            level,
            rationale
        ));
    }
    section.push('\n');

    section
}

fn generate_evidence_section(evidence: &[Evidence]) -> String {
    if evidence.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Evidence\n\n");

    for item in evidence {
        match item {
            Evidence::SearchResults { results } => {
                section.push_str("### Search Results\n\n");
                for result in results {
                    section.push_str(&format!(
                        "- [{}]({}): {}\n",
                        result.title, result.url, result.snippet
                    ));
                }
            }
            Evidence::Features { category, features } => {
                section.push_str(&format!("### {} Features\n\n", category.title()));
                section.push_str(&format!("```\n{}\n```\n", features));
            }
        }
        section.push('\n');
    }

    section
}

fn generate_footer(result: &TrustReport) -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Aggregation model: {}*\n",
        result.aggregation_model
    ));

    footer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Features, WebResult};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn create_test_output() -> AnalysisOutput {
        let metadata = RunMetadata {
            query: "Is USDT at 0xdAC17F958D2ee523a2206206994597C13D831ec7 safe?".to_string(),
            analysis_date: Utc::now(),
            model_used: Some("test-model".to_string()),
            llm_available: true,
            duration_seconds: 1.5,
            context: serde_json::json!({"chain": "ethereum"}),
        };

        let result = TrustReport {
            trust_index: 0.95,
            scores: BTreeMap::from([
                (Category::Phishing, 0.2),
                (Category::Transaction, 0.7),
                (Category::Rugpull, 0.902),
            ]),
            rationales: BTreeMap::from([
                (Category::Phishing, "Valid SSL.".to_string()),
                (Category::Transaction, "Few wallets | bursts".to_string()),
                (Category::Rugpull, "Unlock soon.".to_string()),
            ]),
            evidence: vec![
                Evidence::SearchResults {
                    results: vec![WebResult {
                        title: "Forum Discussion".to_string(),
                        url: "https://forum.example/x".to_string(),
                        snippet: "Reports of possible past issues.".to_string(),
                    }],
                },
                Evidence::Features {
                    category: Category::Rugpull,
                    features: Features::new("USDT").with("age_days", 11),
                },
            ],
            aggregation_model: "Noisy-OR Weighted + Overrides".to_string(),
            final_report: "Trust Index: 0.950 (0 = safe, 1 = high risk)".to_string(),
        };

        AnalysisOutput { metadata, result }
    }

    #[test]
    fn test_generate_markdown_report() {
        let output = create_test_output();
        let markdown = generate_markdown_report(&output);

        assert!(markdown.contains("# VETRA Risk Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("`test-model`"));
        assert!(markdown.contains("**0.950**"));
        assert!(markdown.contains("High risk"));
        assert!(markdown.contains("| Rugpull | 0.902 |"));
        assert!(markdown.contains("Few wallets \\| bursts"));
        assert!(markdown.contains("### Rugpull Features"));
        assert!(markdown.contains("[Forum Discussion](https://forum.example/x)"));
        assert!(markdown.contains("*Aggregation model: Noisy-OR Weighted + Overrides*"));
    }

    #[test]
    fn test_metadata_section_offline() {
        let mut output = create_test_output();
        output.metadata.model_used = None;
        output.metadata.llm_available = false;

        let section = generate_metadata_section(&output.metadata);
        assert!(section.contains("offline"));
        assert!(section.contains("1.5s"));
    }

    #[test]
    fn test_generate_json_report() {
        let output = create_test_output();
        let json = generate_json_report(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["result"]["trust_index"], 0.95);
        assert_eq!(value["result"]["scores"]["transaction"], 0.7);
        assert_eq!(value["result"]["evidence"][0]["kind"], "search_results");
        assert_eq!(value["result"]["evidence"][1]["features"]["age_days"], 11);
        assert_eq!(value["metadata"]["context"]["chain"], "ethereum");
    }

    #[test]
    fn test_generate_text_report() {
        let output = create_test_output();
        assert_eq!(
            generate_text_report(&output),
            "Trust Index: 0.950 (0 = safe, 1 = high risk)\n"
        );
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_report("hello", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }
}
