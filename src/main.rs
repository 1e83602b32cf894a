//! VETRA - crypto trust index from phishing, transaction and rug-pull signals
//!
//! A CLI tool that scores a query with three category analyzers backed by
//! an Ollama model and folds the scores into one trust index.
//!
//! Exit codes:
//!   0 - Success (trust index below threshold, or no --fail-on set)
//!   1 - Runtime error (config, input file, report writing, etc.)
//!   2 - Trust index at or above the --fail-on level

mod agent;
mod analysis;
mod cli;
mod config;
mod models;
mod pipeline;
mod report;
mod sources;

use agent::{LlmHandle, OllamaClient, OllamaConfig};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{AnalysisOutput, RunMetadata, TransactionInput};
use pipeline::Pipeline;
use serde_json::Value;
use sources::{FeatureSource, FixtureFeatures, StaticFeatures, StaticSearch};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("VETRA v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .vetra.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the model, weights, overrides, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one analysis end to end. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let query = resolve_query(&args)?;
    let context = parse_context(args.context.as_deref())?;

    let llm = build_llm(&config)?;
    let features = build_feature_source(&config)?;

    if !args.quiet {
        match llm.model_name() {
            Some(model) => {
                eprintln!("🤖 Model: {} via {}", model, config.model.ollama_url);
                eprintln!("   Timeout: {}s", config.model.timeout_seconds);
            }
            None => eprintln!("📴 Offline: analyzers use their fallback answers"),
        }
    }

    let pipeline = Pipeline::new(llm, Arc::new(StaticSearch), features)
        .with_aggregation(config.aggregation.to_aggregation_config())
        .with_parallel_analyzers(config.general.parallel_analyzers);

    let spinner = (!args.quiet).then(new_spinner);
    let result = pipeline.analyze(&query).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let level = result.level();
    let output = AnalysisOutput {
        metadata: RunMetadata {
            query,
            analysis_date: Utc::now(),
            model_used: pipeline.llm().model_name().map(str::to_string),
            llm_available: pipeline.llm().is_available(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
            context,
        },
        result,
    };

    let rendered = match args.format {
        OutputFormat::Text => report::generate_text_report(&output),
        OutputFormat::Markdown => report::generate_markdown_report(&output),
        OutputFormat::Json => report::generate_json_report(&output)?,
    };

    match config.general.output {
        Some(ref path) => {
            report::write_report(&rendered, path)?;
            if !args.quiet {
                eprintln!(
                    "\n{} Trust index {:.3} ({} risk). Report saved to: {}",
                    level.emoji(),
                    output.result.trust_index,
                    level,
                    path.display()
                );
            }
        }
        None => print!("{}", rendered),
    }

    // Check --fail-on threshold
    if let Some(fail_level) = args.fail_on {
        if fail_level.is_reached_by(level) {
            eprintln!(
                "\n⛔ Trust index {:.3} is at or above {:?} risk. Failing (exit code 2).",
                output.result.trust_index, fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// The positional query, or the sentence built from --transaction.
fn resolve_query(args: &Args) -> Result<String> {
    if let Some(ref path) = args.transaction {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transaction file: {}", path.display()))?;
        let transaction: TransactionInput = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse transaction file: {}", path.display()))?;
        return Ok(transaction.to_query());
    }

    match args.query {
        Some(ref query) => Ok(query.clone()),
        None => bail!("Either a query or --transaction is required"),
    }
}

fn parse_context(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Object(Default::default()));
    };

    let value: Value = serde_json::from_str(raw).context("Failed to parse --context as JSON")?;
    if !value.is_object() {
        bail!("--context must be a JSON object");
    }
    Ok(value)
}

fn build_llm(config: &Config) -> Result<LlmHandle> {
    if !config.model.enabled {
        info!("Language model disabled; running offline");
        return Ok(LlmHandle::Unavailable);
    }

    let client = OllamaClient::new(OllamaConfig {
        ollama_url: config.model.ollama_url.clone(),
        model_name: config.model.name.clone(),
        temperature: config.model.temperature,
        timeout_seconds: config.model.timeout_seconds,
    })
    .context("Failed to create Ollama client")?;

    Ok(LlmHandle::available(client))
}

fn build_feature_source(config: &Config) -> Result<Arc<dyn FeatureSource>> {
    match config.sources.features_file {
        Some(ref path) => Ok(Arc::new(FixtureFeatures::load(path)?)),
        None => Ok(Arc::new(StaticFeatures)),
    }
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Analyzing phishing, transaction and rug-pull risk...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
