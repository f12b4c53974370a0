//! rasterchain CLI
//!
//! Copies an input raster into scratch space, runs a recipe of chained
//! external commands over it and reports the final artifact.

mod recipe;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rasterchain_core::{
    load_config, metrics, validate_config, Artifact, Engine, EngineConfig, Pipeline,
};

use recipe::Recipe;

#[derive(Parser)]
#[command(name = "rasterchain", version)]
#[command(about = "Chain external raster tools over scratch copies", long_about = None)]
struct Cli {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, env = "RASTERCHAIN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recipe against an input file
    Run {
        /// Input raster
        input: PathBuf,

        /// Recipe file
        recipe: PathBuf,

        /// Keep the final output here; scratch space is removed on exit
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print Prometheus metrics to stderr when done
        #[arg(long)]
        metrics: bool,
    },

    /// Validate configuration, and optionally a recipe
    Validate {
        /// Recipe file to check as well
        #[arg(long)]
        recipe: Option<PathBuf>,
    },
}

/// Printed to stdout after a run.
#[derive(Debug, Serialize)]
struct RunSummary {
    input: PathBuf,
    steps: usize,
    artifact: Artifact,
    saved_to: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

/// Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let config = config_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            recipe,
            output,
            metrics,
        } => {
            let recipe = Recipe::load(&recipe)?;
            let summary = run_recipe(config, &input, recipe, output).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if metrics {
                print_metrics()?;
            }
            Ok(!summary.artifact.is_failed())
        }
        Commands::Validate { recipe } => {
            if let Some(path) = recipe {
                let recipe = Recipe::load(&path)?;
                info!("Recipe {:?} has {} step(s)", path, recipe.steps.len());
            }
            info!("Configuration is valid");
            Ok(true)
        }
    }
}

fn config_from(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => EngineConfig::default(),
    };
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run_recipe(
    config: EngineConfig,
    input: &Path,
    recipe: Recipe,
    output: Option<PathBuf>,
) -> Result<RunSummary> {
    let engine = Engine::new(config);
    let steps = recipe.steps.len();
    info!(input = %input.display(), steps, "Running recipe");

    let inner = engine.clone();
    let (artifact, saved_to) = engine
        .with_copied_file(input, |dir, copied| async move {
            let mut pipeline = Pipeline::new(copied);
            for step in recipe.steps {
                pipeline = pipeline.then(inner.operation(&dir, &step.command, step.options)?);
            }
            let artifact = pipeline.run().await?.artifact();

            let saved_to = match output {
                Some(path) if !artifact.is_failed() => {
                    tokio::fs::copy(artifact.output(), &path)
                        .await
                        .with_context(|| format!("Failed to save output to {:?}", path))?;
                    info!("Saved output to {:?}", path);
                    Some(path)
                }
                Some(path) => {
                    warn!("Pipeline failed, not saving output to {:?}", path);
                    None
                }
                None => None,
            };
            Ok::<_, anyhow::Error>((artifact, saved_to))
        })
        .await?;

    let status = engine.pool().status();
    info!(
        processed = status.total_processed,
        failed = status.total_failed,
        "Worker pool finished"
    );

    Ok(RunSummary {
        input: input.to_path_buf(),
        steps,
        artifact,
        saved_to,
    })
}

fn print_metrics() -> Result<()> {
    let registry = Registry::new();
    for metric in metrics::all_metrics() {
        registry.register(metric)?;
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    eprint!("{}", String::from_utf8(buffer)?);
    Ok(())
}
