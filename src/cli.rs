//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::RiskLevel;
use clap::Parser;
use std::path::PathBuf;

/// VETRA - crypto trust index from phishing, transaction and rug-pull signals
///
/// Scores a query across three risk categories and combines them into a
/// single trust index (0 = safe, 1 = high risk) using a local Ollama model.
///
/// Examples:
///   vetra "Is PEPE at 0x6982508145454ce325ddbe47a25d4ec3d2311933 safe?"
///   vetra --transaction tx.json --format json
///   vetra --offline --format markdown --output report.md "USDT airdrop"
///   vetra --fail-on high "SCAM token presale"
///   vetra --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Free-text query to analyze
    ///
    /// Not required when using --transaction or --init-config.
    #[arg(
        value_name = "QUERY",
        required_unless_present_any = ["transaction", "init_config"],
        conflicts_with = "transaction"
    )]
    pub query: Option<String>,

    /// JSON file describing a transaction to analyze instead of a query
    ///
    /// Recognized fields: token_symbol, token_address, from_address,
    /// to_address, amount, type. All are optional.
    #[arg(short, long, value_name = "FILE")]
    pub transaction: Option<PathBuf>,

    /// Extra context as a JSON object, recorded in the run metadata
    #[arg(long, value_name = "JSON")]
    pub context: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .vetra.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ollama model to use for analysis
    ///
    /// Can also be set via VETRA_MODEL env var or .vetra.toml config.
    #[arg(short, long, env = "VETRA_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not call the model; every analyzer uses its fallback answer
    #[arg(long)]
    pub offline: bool,

    /// Run the three analyzers concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Output format (text, markdown, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fail if the trust index falls at or above this risk level
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is reached.
    /// Values: low, medium, high
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .vetra.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain-text summary (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

/// Risk level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Low,
    Medium,
    High,
}

impl FailOnLevel {
    pub fn risk_level(self) -> RiskLevel {
        match self {
            FailOnLevel::Low => RiskLevel::Low,
            FailOnLevel::Medium => RiskLevel::Medium,
            FailOnLevel::High => RiskLevel::High,
        }
    }

    /// Whether a trust index at `level` should fail the run.
    pub fn is_reached_by(self, level: RiskLevel) -> bool {
        level >= self.risk_level()
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref query) = self.query {
            if query.trim().is_empty() {
                return Err("Query must not be empty".to_string());
            }
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.transaction {
            if !path.is_file() {
                return Err(format!(
                    "Transaction file does not exist: {}",
                    path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
