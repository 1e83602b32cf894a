//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.vetra.toml` files.

use crate::analysis::aggregator::default_overrides;
use crate::analysis::{AggregationConfig, OverrideRule};
use crate::models::Category;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".vetra.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Language model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Trust index weights and overrides.
    #[serde(default)]
    pub aggregation: AggregationSection,

    /// External data sources.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report file path; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Run the three analyzers concurrently.
    #[serde(default)]
    pub parallel_analyzers: bool,
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Consult the model at all; when false every analyzer uses its fallback.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    60
}

/// Aggregation settings as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSection {
    #[serde(default)]
    pub weights: WeightsConfig,

    #[serde(default = "default_overrides")]
    pub overrides: Vec<OverrideRule>,
}

impl Default for AggregationSection {
    fn default() -> Self {
        Self {
            weights: WeightsConfig::default(),
            overrides: default_overrides(),
        }
    }
}

/// Per-category Noisy-OR weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_phishing_weight")]
    pub phishing: f64,

    #[serde(default = "default_transaction_weight")]
    pub transaction: f64,

    #[serde(default = "default_rugpull_weight")]
    pub rugpull: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            phishing: default_phishing_weight(),
            transaction: default_transaction_weight(),
            rugpull: default_rugpull_weight(),
        }
    }
}

fn default_phishing_weight() -> f64 {
    0.95
}

fn default_transaction_weight() -> f64 {
    0.75
}

fn default_rugpull_weight() -> f64 {
    0.85
}

impl AggregationSection {
    /// Convert to the aggregator's input.
    pub fn to_aggregation_config(&self) -> AggregationConfig {
        AggregationConfig {
            weights: BTreeMap::from([
                (Category::Phishing, self.weights.phishing),
                (Category::Transaction, self.weights.transaction),
                (Category::Rugpull, self.weights.rugpull),
            ]),
            overrides: self.overrides.clone(),
        }
    }

    /// Reject weights, thresholds or floors outside their ranges.
    pub fn validate(&self) -> Result<()> {
        for (category, weight) in self.to_aggregation_config().weights {
            if !weight.is_finite() || weight < 0.0 {
                bail!("Weight for {} must be a non-negative number, got {}", category, weight);
            }
        }

        for rule in &self.overrides {
            if !(0.0..=1.0).contains(&rule.threshold) {
                bail!(
                    "Override threshold for {} must be between 0.0 and 1.0, got {}",
                    rule.category,
                    rule.threshold
                );
            }
            if !(0.0..=1.0).contains(&rule.floor) {
                bail!(
                    "Override floor for {} must be between 0.0 and 1.0, got {}",
                    rule.category,
                    rule.floor
                );
            }
        }

        Ok(())
    }
}

/// External data source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// JSON file mapping identifiers to feature objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.vetra.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        // Flags always override
        if args.offline {
            self.model.enabled = false;
        }
        if args.parallel {
            self.general.parallel_analyzers = true;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }
    }

    /// Validate values the type system cannot.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.model.temperature) {
            bail!("Temperature must be between 0.0 and 1.0");
        }
        if self.model.timeout_seconds == 0 {
            bail!("Timeout must be at least 1 second");
        }
        self.aggregation
            .validate()
            .context("Invalid [aggregation] section")
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
