use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tinybeast_config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod backends;
mod console;
mod controller;
mod events;
mod io;
mod profile;
mod state;

use self::controller::AppController;
use self::profile::ProfileStore;
use self::state::AppState;

/// Tiny Beast translator
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Settings profile to load and save
    #[arg(long, default_value = "main")]
    profile: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = Config::new();
    let profile = ProfileStore::user(&args.profile)?;
    let settings = profile.load();
    tracing::info!("Using profile '{}'", args.profile);

    let state = Arc::new(AppState::new(config, settings, profile));
    let mut controller = AppController::new(state.clone());
    let mut tasks = controller.spawn_tasks().await?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::info!("Task finished, shutting down"),
                Ok(Err(e)) => tracing::error!("Task failed: {e:#}"),
                Err(e) => tracing::error!("Task panicked: {e}"),
            }
        }
    }

    controller.shutdown(tasks, Duration::from_secs(3)).await
}

/// Logs go to stderr, stdout belongs to the console
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(atty::is(atty::Stream::Stderr)),
            )
            .init();
    }
}
