//! `bundles` -- command-line driver for coupled thread bundle scans.
//!
//! ```text
//! bundles run scan.yml              # simulate every (W_coh, N) pair
//! bundles analyse outputs/scan      # write summary.json
//! bundles fit outputs/scan          # write scaling.json
//! ```
//!
//! Logging goes through `tracing`; the filter comes from `--log-level`,
//! then `RUST_LOG`, then defaults to `info`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bundles_core::Execution;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bundles")]
#[command(about = "Simulate and analyse ensembles of coupled two-state thread bundles")]
#[command(version)]
struct Cli {
    /// Log filter directive (e.g. `debug` or `bundles_core=debug`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate every pair of a scan and write the archives
    Run {
        /// YAML scan configuration
        config: PathBuf,

        /// Run ensemble members one after another on one thread
        #[arg(long)]
        sequential: bool,

        /// Override `output_dir` from the configuration
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Reduce every archived pair to a summary record
    Analyse {
        /// Output directory of a previous `run`
        output_dir: PathBuf,
    },

    /// Fit amplitude exponents and suppression ratios across pairs
    Fit {
        /// Output directory of a previous `run`
        output_dir: PathBuf,
    },
}

fn init_tracing(log_level: Option<&str>) -> Result<()> {
    let filter = match log_level {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid --log-level `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Run {
            config,
            sequential,
            output_dir,
        } => {
            let execution = if sequential {
                Execution::Sequential
            } else {
                Execution::Parallel
            };
            commands::run(&config, output_dir.as_deref(), execution)
        }
        Commands::Analyse { output_dir } => commands::analyse(&output_dir),
        Commands::Fit { output_dir } => commands::fit(&output_dir),
    }
}
