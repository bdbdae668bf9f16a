//! Triage CLI - classify CI test failures and decide follow-up actions.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use triage::render::{JsonRenderer, KindCatalog, Renderer, TextRenderer};
use triage::scenarios::default_batch;
use triage::{NewTestFailure, ResultStore, TriageConfig, TriagePipeline};

/// Triage CLI - Classify CI test failures and run follow-up actions.
#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "CI test failure triage pipeline")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON configuration file
    #[arg(long, global = true, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a simulation over a batch of failures
    Simulate {
        /// JSON array of failures (built-in batch when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Submit one failure and show its finished record
    Analyze {
        /// Name of the failed test
        #[arg(long)]
        test_name: String,

        /// Raw log text
        #[arg(long, conflicts_with = "log_file", required_unless_present = "log_file")]
        log: Option<String>,

        /// File containing the raw log
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Test suite
        #[arg(long, default_value = "default")]
        suite: String,

        /// CI build identifier
        #[arg(long, default_value = "local")]
        build_id: String,

        /// Environment the test ran in
        #[arg(long, default_value = "local")]
        environment: String,

        /// Version of the product under test
        #[arg(long, default_value = "0.0.0")]
        version: String,

        /// Repository or branch
        #[arg(long, default_value = "main")]
        repository: String,

        /// Platform the test ran on
        #[arg(long, default_value = "unknown")]
        platform: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// How many times the test was already rerun
        #[arg(long, default_value = "0")]
        rerun_count: u32,
    },

    /// List every classification and action kind
    Kinds,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("triage=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("triage=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = TriageConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let renderer: Box<dyn Renderer> = match cli.format {
        OutputFormat::Text => Box::new(TextRenderer),
        OutputFormat::Json => Box::new(JsonRenderer),
    };

    let output = match cli.command {
        Commands::Simulate { input } => {
            let batch = match input {
                Some(path) => read_batch(&path)?,
                None => default_batch(),
            };
            tracing::info!(count = batch.len(), "Running simulation");

            let pipeline = TriagePipeline::new(config, ResultStore::new());
            let report = pipeline.run_simulation(batch);
            renderer.render_report(&report)?
        }

        Commands::Analyze {
            test_name,
            log,
            log_file,
            suite,
            build_id,
            environment,
            version,
            repository,
            platform,
            tags,
            rerun_count,
        } => {
            let logs = match (log, log_file) {
                (Some(log), _) => log,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read log file {}", path.display()))?,
                (None, None) => bail!("either --log or --log-file is required"),
            };

            let failure = NewTestFailure::new(
                test_name,
                suite,
                build_id,
                environment,
                logs,
                version,
                repository,
                platform,
            )
            .with_tags(tags)
            .with_rerun_count(rerun_count);

            let pipeline = TriagePipeline::new(config, ResultStore::new());
            let id = pipeline.submit(failure);
            let record = pipeline.get_record(&id)?;
            renderer.render_record(&record)?
        }

        Commands::Kinds => renderer.render_catalog(&KindCatalog::new())?,
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn read_batch(path: &Path) -> Result<Vec<NewTestFailure>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse batch file {}", path.display()))
}
