//! pagewatch CLI
//!
//! Runs a single check cycle per invocation; schedule it with cron or a
//! systemd timer for periodic monitoring.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagewatch::{
    error::Result,
    models::Config,
    pipeline,
    storage::FingerprintStore,
};

/// pagewatch - Public Notice Page Watcher
#[derive(Parser, Debug)]
#[command(
    name = "pagewatch",
    version,
    about = "Reports when the visible text of watched pages changes"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every target once and report changes
    Check {
        /// Override the fingerprint file (default: state.path from config)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Also append events as JSON lines to this file
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show stored fingerprints for the configured targets
    Info,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::error!("Cannot load {}: {}", cli.config.display(), e);
            return Err(e);
        }
    };
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Check { state, events } => {
            if let Some(path) = state {
                config.state.path = path;
            }
            if let Some(path) = events {
                config.notify.events_file = Some(path);
            }

            let report = pipeline::run_check(&config).await?;
            if report.failed() > 0 {
                log::warn!("{} target(s) could not be checked", report.failed());
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} targets)", config.targets.len());
        }

        Command::Info => {
            let store = FingerprintStore::load(&config.state.path).await;
            log::info!("Fingerprint file: {}", store.path().display());
            log::info!("Stored fingerprints: {}", store.len());

            for target in &config.targets {
                match store.get(target.id()) {
                    Some(fp) => log::info!("    {} → {}", target.display_name(), fp),
                    None => log::info!("    {} → (not observed yet)", target.display_name()),
                }
            }

            let orphaned = store
                .iter()
                .filter(|(id, _)| !config.targets.iter().any(|t| t.id() == *id))
                .count();
            if orphaned > 0 {
                log::info!("{} stored fingerprint(s) belong to no configured target", orphaned);
            }
        }
    }

    Ok(())
}
