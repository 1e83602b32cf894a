//! Evidence search used by the phishing analyzer.

use crate::models::WebResult;
use tracing::debug;

/// Looks up public material about a query.
pub trait EvidenceSearch: Send + Sync {
    fn search(&self, query: &str) -> Vec<WebResult>;
}

/// Search stand-in that answers every query with the same two hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSearch;

impl EvidenceSearch for StaticSearch {
    fn search(&self, query: &str) -> Vec<WebResult> {
        debug!("Static search for: {}", query);

        vec![
            WebResult {
                title: "Token X – Official Site".to_string(),
                url: "https://example.com".to_string(),
                snippet: "Audited contract and locked liquidity?".to_string(),
            },
            WebResult {
                title: "Forum Discussion".to_string(),
                url: "https://forum.example/x".to_string(),
                snippet: "Reports of possible past issues.".to_string(),
            },
        ]
    }
}
