#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pmsync_core::config::{self, DEFAULT_CONFIG_FILE};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pms: idempotent CSV-to-ticket reconciliation",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Path to the configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Reconcile record sources against the ticket service",
        long_about = "Reconcile record sources against the ticket service: create a remote \
                      ticket for every record without one and stamp the key back. Records \
                      that already carry a key are never re-submitted.",
        after_help = "EXAMPLES:\n    # Dry run over the configured sources\n    pms sync\n\n    # Create tickets for real and write keys back\n    pms sync --commit\n\n    # Exercise the full pipeline against the built-in fake\n    pms sync --commit --simulate pm/epics.csv"
    )]
    Sync(cmd::sync::SyncArgs),

    #[command(
        about = "Validate sources and column mapping, no network calls",
        after_help = "EXAMPLES:\n    # Check the configured sources\n    pms check\n\n    # Check one file\n    pms check pm/epics.csv"
    )]
    Check(cmd::check::CheckArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PMS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "pmsync=debug,info"
        } else {
            "pmsync=info,warn"
        })
    });

    // Logs go to stderr; stdout carries only the report.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = config::load_config(&config_path)?;
    tracing::debug!(path = %config_path.display(), "configuration resolved");

    match cli.command {
        Commands::Sync(args) => cmd::sync::run_sync(&args, &config, cli.json),
        Commands::Check(args) => cmd::check::run_check(&args, &config, cli.json),
    }
}
