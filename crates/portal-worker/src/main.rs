//! Portal Worker - drives season lifecycle transitions.
//!
//! Runs the season engine's sweep on a fixed interval: ends seasons whose
//! window has closed, spawns successors of recurring seasons, activates due
//! drafts and archives old results.

use chrono::{DateTime, Utc};
use clap::Parser;
use portal_core::config::PortalConfig;
use portal_core::{db, SeasonEngine, SweepReport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Portal Worker - runs the season lifecycle sweep.
#[derive(Parser, Debug)]
#[command(name = "portal-worker")]
#[command(about = "Runs the season lifecycle sweep")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "portal.toml")]
    config: PathBuf,

    /// Sweep interval in seconds, overrides seasons.sweep_interval_secs
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    fn interval(&self, config: &PortalConfig) -> Duration {
        let secs = self
            .interval
            .filter(|s| *s > 0)
            .unwrap_or(config.seasons.sweep_interval_secs);
        Duration::from_secs(secs)
    }
}

/// Runs one sweep and logs what it changed.
fn sweep_once(engine: &SeasonEngine, now: DateTime<Utc>) -> anyhow::Result<SweepReport> {
    let report = engine.sweep(now)?;
    if report.is_empty() {
        tracing::debug!("Sweep: nothing to do");
    } else {
        tracing::info!(
            ended = report.ended.len(),
            spawned = report.spawned.len(),
            activated = report.activated.len(),
            archived = report.archived.len(),
            failed = report.failed.len(),
            "Sweep finished"
        );
    }
    for id in &report.failed {
        tracing::warn!("Season {} failed to advance, will retry next sweep", id);
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = PortalConfig::load_from(&args.config)?;
    let interval = args.interval(&config);

    tracing::info!("Starting portal-worker");
    tracing::info!("Config: {:?}", args.config);
    tracing::info!("Database: {:?}", config.database.path);
    tracing::info!("Sweep interval: {}s", interval.as_secs());

    if let Some(dir) = config.database.path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let pool = db::init_db(&config.database.path)?;
    let engine = SeasonEngine::new(pool, config.seasons.clone());
    match engine.settings().archive_after() {
        Some(age) => tracing::info!("Archiving ended seasons after {} days", age.num_days()),
        None => tracing::info!("Archiving disabled"),
    }

    if args.once {
        sweep_once(&engine, Utc::now())?;
        return Ok(());
    }

    // Shutdown flag
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown_clone.store(true, Ordering::SeqCst);
    });

    let tick = Duration::from_millis(250);
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        if let Err(e) = sweep_once(&engine, Utc::now()) {
            tracing::error!("Sweep failed: {:#}", e);
        }

        // Sleep in short ticks so a shutdown is noticed promptly.
        let mut waited = Duration::ZERO;
        while waited < interval && !shutdown.load(Ordering::SeqCst) {
            tokio::time::sleep(tick).await;
            waited += tick;
        }
    }

    tracing::info!("Worker shutdown complete");
    Ok(())
}
