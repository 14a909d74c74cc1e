//! Strand CLI - Command-line interface for dataset assembly
//!
//! Builds task-shaped training datasets from corpus files and manages the
//! lazy caches of named corpora.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Strand - Training dataset assembly
#[derive(Parser, Debug)]
#[command(name = "strand", author, version, about = "Strand - Task-shaped training dataset assembly")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the configured dataset and report its shape
    ///
    /// Resolves every corpus, builds the tokenizer, splits and windows the
    /// result, then prints slot sizes and the corpus fingerprint.
    Build {
        /// Dataset config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Corpus path or registered corpus name (repeatable, overrides config)
        #[arg(short, long = "path")]
        paths: Vec<String>,

        /// Split proportions, e.g. "0.8,0.1,0.1"
        #[arg(long)]
        split: Option<String>,

        /// Task type (bert, gpt2); empty for plain text
        #[arg(long)]
        ds_type: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Materialize the lazy cache of a named corpus
    Cache {
        /// Registered corpus name
        name: String,

        /// Dataset config file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered corpora and their cache status
    Corpora {
        /// Dataset config file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Build { config, paths, split, ds_type, json } => {
            let overrides = config::Overrides { paths, split, ds_type };
            let config = config::load(config.as_deref(), &overrides)?;
            commands::build::execute(&config, json)
        }
        Command::Cache { name, config, json } => {
            let config = config::load(Some(config.as_path()), &config::Overrides::default())?;
            commands::cache::execute(&config, &name, json)
        }
        Command::Corpora { config, json } => {
            let config = config::load(Some(config.as_path()), &config::Overrides::default())?;
            commands::corpora::execute(&config, json)
        }
    }
}
