//! Transfer daemon
//!
//! Reads commands from stdin, one per line, and ships segments and playlists to every
//! configured destination:
//! - `first,last,ended,profile` ships segment `last` of `profile` and its rolling playlist
//! - `multi` rebuilds the master playlist
//! - `quit` (or end of input) drains the queue and exits
//!
//! Usage: `hls-transfer [CONFIG]`. Without an argument the file named by
//! `HLS_TRANSFER_CONFIG` (or `hls-transfer.toml`) is used.

use hls_transfer::adapters::registry;
use hls_transfer::application::worker::{TransferWorker, WorkerContext};
use hls_transfer::config::Config;
use hls_transfer::domain::commands::Command;
use hls_transfer::error::ConfigError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let (config, targets) = match load().await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            std::process::exit(1);
        }
    };

    let worker = TransferWorker::new(WorkerContext::from(&config), targets).spawn();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("End of input");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if !worker.push(command) {
                    tracing::error!("Worker is gone");
                    break;
                }
            }
            Err(e) => tracing::warn!(line = %line, error = %e, "Ignoring malformed command"),
        }
    }

    if let Err(e) = worker.shutdown().await {
        tracing::error!(error = %e, "Worker task failed");
        std::process::exit(1);
    }
}

async fn load() -> Result<(Config, Vec<hls_transfer::ports::TransferTarget>), ConfigError> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    let targets = registry::build_targets(&config.transfer_profiles).await?;
    tracing::info!(
        destinations = targets.len(),
        encoding_profiles = config.encoding_profiles.len(),
        "Configuration loaded"
    );
    Ok((config, targets))
}
