//! `ponv` - score assessments, evaluate datasets and manage the assessment log.

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ponv_core::config::{EngineConfig, DEFAULT_CONFIG_PATH, SCORING_VARIANT_ENV};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ponv", version, about = "Hybrid PONV risk scoring engine")]
struct Cli {
    /// Engine config (TOML); otherwise $PONV_CONFIG_PATH, then config/ponv.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Assessment log database, overriding the configured path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one assessment given as form JSON ("-" reads stdin)
    Score {
        input: PathBuf,
        /// Scoring variant, overriding the configured one
        #[arg(long)]
        variant: Option<String>,
        /// Append the result to the assessment log
        #[arg(long)]
        log: bool,
        /// Train the reference classifiers and include their probabilities
        #[arg(long)]
        models: bool,
        /// Print the full report bundle as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a labeled CSV dataset against the hybrid score and classifiers
    Evaluate {
        input: PathBuf,
        /// Classifier probability counted as a positive prediction
        #[arg(long)]
        threshold: Option<f64>,
        /// Skip classifier training; evaluate the hybrid score only
        #[arg(long)]
        no_models: bool,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a seeded synthetic cohort in the evaluation CSV layout
    Generate {
        output: PathBuf,
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Inspect the assessment log
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
}

#[derive(Subcommand, Debug)]
enum LogsAction {
    /// List entries, newest first
    List,
    /// Export every entry
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Walk the hash chain and report the first broken entry
    Verify,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportFormat {
    Json,
    Csv,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ponv=info,ponv_core=info,ponv_models=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let variant = std::env::var(SCORING_VARIANT_ENV).ok();
            EngineConfig::resolve(
                Some(&path.to_string_lossy()),
                Path::new(DEFAULT_CONFIG_PATH),
                variant.as_deref(),
            )
            .with_context(|| format!("loading config {}", path.display()))?
        }
        None => EngineConfig::load().context("loading engine config")?,
    };
    if let Some(db) = &cli.db {
        config.log_store.path = db.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Score {
            input,
            variant,
            log,
            models,
            json,
        } => {
            if let Some(variant) = variant {
                config.scoring.variant = variant.parse()?;
            }
            commands::score(&config, &input, log, models, json)
        }
        Command::Evaluate {
            input,
            threshold,
            no_models,
            json,
        } => {
            if let Some(threshold) = threshold {
                config.evaluation.decision_threshold = threshold;
                config.validate()?;
            }
            commands::evaluate(&config, &input, !no_models, json)
        }
        Command::Generate {
            output,
            samples,
            seed,
        } => {
            let samples = samples.unwrap_or(config.training.samples);
            let seed = seed.unwrap_or(config.training.seed);
            commands::generate(&output, samples, seed)
        }
        Command::Logs { action } => match action {
            LogsAction::List => commands::list_logs(&config),
            LogsAction::Export { format, output } => {
                commands::export_logs(&config, format == ExportFormat::Csv, output.as_deref())
            }
            LogsAction::Verify => commands::verify_logs(&config),
        },
    }
}
