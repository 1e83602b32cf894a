//! Attribute lookups for wallets, transactions and tokens.
//!
//! Also home to the heuristic rugpull estimator, which only ever reads
//! attributes produced here.

use crate::models::{clamp_score, Features};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Supplies named attributes for an identifier.
pub trait FeatureSource: Send + Sync {
    fn fetch_features(&self, identifier: &str) -> Features;
}

/// Stand-in data source returning the same simulated attributes for every identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFeatures;

impl FeatureSource for StaticFeatures {
    fn fetch_features(&self, identifier: &str) -> Features {
        debug!("Static features for: {}", identifier);

        Features::new(identifier)
            .with("holders_top10", 0.76)
            .with("lp_locked_days", 2)
            .with("tx_velocity", 1.8)
            .with("age_days", 11)
    }
}

/// Attributes loaded from a JSON fixture keyed by identifier.
///
/// The file holds an object mapping each identifier to an object of
/// attributes. Unknown identifiers get the [`StaticFeatures`] values.
#[derive(Debug, Clone, Default)]
pub struct FixtureFeatures {
    entries: HashMap<String, Map<String, Value>>,
}

impl FixtureFeatures {
    /// Load fixtures from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read features file: {}", path.display()))?;

        let fixtures = Self::from_json(&content)
            .with_context(|| format!("Failed to parse features file: {}", path.display()))?;

        info!(
            "Loaded features for {} identifiers from {}",
            fixtures.len(),
            path.display()
        );
        Ok(fixtures)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: HashMap<String, Map<String, Value>> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FeatureSource for FixtureFeatures {
    fn fetch_features(&self, identifier: &str) -> Features {
        let Some(attributes) = self.entries.get(identifier) else {
            debug!("No fixture for {}, using static features", identifier);
            return StaticFeatures.fetch_features(identifier);
        };

        let mut features = Features::new(identifier);
        for (name, value) in attributes {
            if name != "identifier" {
                features.insert(name, value.clone());
            }
        }
        features
    }
}

/// Heuristic rugpull risk in [0, 1].
///
/// Top-10 holder concentration contributes up to 1.0 (scaled by 0.8), a
/// liquidity lock shorter than a week adds 0.2 and a token younger than two
/// weeks adds 0.1. Missing attributes read as 0.
pub fn estimate_risk(features: &Features) -> f64 {
    let attr = |name: &str| features.number(name).unwrap_or(0.0);

    let mut risk = (attr("holders_top10") * 0.8).min(1.0);
    if attr("lp_locked_days") < 7.0 {
        risk += 0.2;
    }
    if attr("age_days") < 14.0 {
        risk += 0.1;
    }

    clamp_score(risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_static_features() {
        let features = StaticFeatures.fetch_features("USDT");
        assert_eq!(features.identifier(), Some("USDT"));
        assert_eq!(features.number("holders_top10"), Some(0.76));
        assert_eq!(features.number("lp_locked_days"), Some(2.0));
        assert_eq!(features.number("age_days"), Some(11.0));
    }

    #[test]
    fn test_estimate_risk_on_static_features() {
        let risk = estimate_risk(&StaticFeatures.fetch_features("tokenX"));
        assert!((risk - 0.908).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_risk_missing_attributes() {
        // no concentration, but zero lock days and zero age still count as young/unlocked
        let risk = estimate_risk(&Features::new("bare"));
        assert!((risk - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_risk_is_capped() {
        let features = Features::new("whale").with("holders_top10", 2.0);
        assert_eq!(estimate_risk(&features), 1.0);
    }

    #[test]
    fn test_estimate_risk_mature_token() {
        let features = Features::new("SAFE")
            .with("holders_top10", 0.15)
            .with("lp_locked_days", 180)
            .with("age_days", 250);
        assert!((estimate_risk(&features) - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_fixture_features_lookup_and_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"SAFE": {{"holders_top10": 0.15, "lp_locked_days": 180, "age_days": 250, "identifier": "ignored"}}}}"#
        )
        .unwrap();

        let fixtures = FixtureFeatures::load(file.path()).unwrap();
        assert_eq!(fixtures.len(), 1);

        let known = fixtures.fetch_features("SAFE");
        assert_eq!(known.identifier(), Some("SAFE"));
        assert_eq!(known.number("lp_locked_days"), Some(180.0));
        assert_eq!(known.number("tx_velocity"), None);

        let unknown = fixtures.fetch_features("OTHER");
        assert_eq!(unknown, StaticFeatures.fetch_features("OTHER"));
    }

    #[test]
    fn test_fixture_features_rejects_malformed_file() {
        assert!(FixtureFeatures::from_json("[1, 2, 3]").is_err());
        assert!(FixtureFeatures::load(Path::new("/nonexistent/features.json")).is_err());
    }
}
