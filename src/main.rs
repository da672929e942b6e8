#![deny(unsafe_code)]

mod common;
mod config;
mod constants;
mod daemon;
mod errors;
mod tray;
mod x11;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::ConfigStore;
use daemon::commands;
use daemon::session::Session;

#[derive(Parser)]
#[command(name = "livepane")]
#[command(version)]
#[command(about = "Live thumbnail panes of desktop windows", long_about = None)]
struct Cli {
    /// Configuration document (defaults to the XDG config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let path = cli.config.unwrap_or_else(ConfigStore::default_path);
    let store = ConfigStore::load(&path).context(format!("Failed to load configuration {:?}", path))?;
    let session = Arc::new(Session::new(Arc::new(store)));

    let (tx, rx) = commands::channel();
    let (menu, tray) = tray::spawn_tray(tx.clone());
    let monitor = daemon::spawn_monitor(Arc::clone(&session), tx.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;
    let result = runtime.block_on(daemon::run(Arc::clone(&session), menu, tx, rx));

    session.request_shutdown();
    if monitor.join().is_err() {
        error!("Window monitor thread panicked");
    }
    tray.shutdown();

    if session.store().is_dirty()
        && let Err(e) = session.store().save()
    {
        error!(error = %e, "Failed to save configuration on exit");
    }
    info!("Exited");
    result
}
