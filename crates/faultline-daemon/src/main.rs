//! faultlined — crash tombstone ingestion daemon.
//!
//! Wires the classification pipeline to its collaborators: loads the static
//! package table and settings from config, probes platform capabilities,
//! replays the historical queue once, then polls the tombstone directory for
//! live reports until shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use faultline_core::platform::PlatformCaps;
use faultline_core::policy::PolicyEngine;
use faultline_core::settings::StaticSettings;
use faultline_daemon::config::FaultlineConfig;
use faultline_daemon::handler::TombstoneHandler;
use faultline_daemon::presenter::LogPresenter;
use faultline_daemon::registries::{InMemoryProcessRegistry, TablePackageRegistry};
use faultline_daemon::sources;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "faultlined", about = "Crash tombstone ingestion daemon")]
struct Args {
    /// Path to the daemon configuration file.
    #[arg(long, default_value = "/etc/faultline/faultlined.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = FaultlineConfig::from_file(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    let caps = PlatformCaps::detect();
    info!(
        memory_tagging = caps.memory_tagging,
        packages = config.packages.len(),
        "starting faultlined"
    );

    let package_registry = Arc::new(TablePackageRegistry::from_entries(&config.packages));
    let process_registry = Arc::new(InMemoryProcessRegistry::default());
    let settings = Arc::new(StaticSettings::new(
        config.daemon.show_system_crash_notifications,
    ));

    let policy = PolicyEngine::new(process_registry, package_registry, settings, caps);
    let handler = Arc::new(TombstoneHandler::new(policy, Arc::new(LogPresenter), caps));

    if let Some(queue_dir) = &config.daemon.queue_dir {
        sources::drain_queue(&handler, queue_dir);
    }

    tokio::select! {
        () = sources::poll_tombstone_dir(
            Arc::clone(&handler),
            config.daemon.tombstone_dir.clone(),
            config.daemon.poll_interval,
        ) => {},
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for shutdown signal")?;
            info!("shutdown requested");
        },
    }

    Ok(())
}
