// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `syncerd`: bridges the product-status catalog into WDB and WDB2TS (§1/§4).
//!
//! Mirrors the original's `run`/`main` shape: a startup sync against the
//! catalog, then an edge-triggered loop that wakes on new data or a
//! shutdown signal. Exit codes follow §7: configuration errors exit 1,
//! logging setup failures exit 2, a failed initial catalog connection
//! exits 3, and anything else that escapes the run loop is treated as the
//! uncaught-exception case and exits 255.

mod error;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sy_adapters::{HttpCatalogClient, PollingEventBus, Wdb2TsDriver, WdbDriver};
use sy_config::{Config, DEFAULT_CONFIG_PATH};
use sy_core::{CatalogClient, SystemClock};
use sy_engine::{DataLoader, EngineError, Listener, Reporter};
use sy_storage::StateDb;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::DaemonError;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CONFIG: i32 = 1;
const EXIT_LOGGING: i32 = 2;
const EXIT_CONNECT_PRODUCTSTATUS: i32 = 3;
const EXIT_UNCAUGHT: i32 = 255;

#[derive(Parser)]
#[command(name = "syncerd", about = "Bridges the product-status catalog into WDB and WDB2TS")]
struct Cli {
    /// Path to the INI configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(code) = run_main().await {
        std::process::exit(code);
    }
}

async fn run_main() -> Result<(), i32> {
    if setup_logging().is_err() {
        eprintln!("There is an error in the logging configuration");
        return Err(EXIT_LOGGING);
    }

    info!("Starting Syncer...");
    let cli = Cli::parse();

    let config = Config::load(&cli.config).map_err(|e| {
        error!(error = %e, "configuration error");
        EXIT_CONFIG
    })?;

    match run(config).await {
        Ok(()) => {
            info!("Exiting with status {EXIT_SUCCESS}");
            Ok(())
        }
        Err(DaemonError::Config(e)) => {
            error!(error = %e, "configuration error");
            Err(EXIT_CONFIG)
        }
        Err(DaemonError::ConnectProductstatus(e)) => {
            error!(error = %e, "could not reach the product-status catalog at startup");
            Err(EXIT_CONNECT_PRODUCTSTATUS)
        }
        Err(e) => {
            error!("***********************************************************");
            error!("Uncaught exception during program execution. THIS IS A BUG!");
            error!("***********************************************************");
            error!(error = %e, "uncaught error");
            Err(EXIT_UNCAUGHT)
        }
    }
}

fn setup_logging() -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).try_init()
}

async fn run(config: Config) -> Result<(), DaemonError> {
    let syncer = config.syncer()?;
    let productstatus = config.productstatus()?;
    let wdb = config.wdb()?;
    let wdb2ts = config.wdb2ts()?;
    let registry = Arc::new(config.model_registry()?);

    let state_db = StateDb::open(&syncer.state_database_file)
        .map_err(|e| DaemonError::Engine(EngineError::StateDb(e)))?;
    let reporter = Arc::new(Reporter::new(state_db.clone()));
    let catalog = Arc::new(
        HttpCatalogClient::new(&productstatus.url, productstatus.verify_ssl)
            .map_err(DaemonError::ConnectProductstatus)?,
    );

    check_catalog_reachable(&catalog, &registry).await?;

    let bus = PollingEventBus::new(&productstatus.url, productstatus.verify_ssl)
        .map_err(|e| DaemonError::ConnectProductstatus(sy_core::CatalogError::Transport(e.to_string())))?;

    let max_heartbeat_delay = if productstatus.max_heartbeat_delay > 0 {
        Some(Duration::from_secs((productstatus.max_heartbeat_delay * 60) as u64))
    } else {
        None
    };

    let new_data = Arc::new(Notify::new());
    let stopping = Arc::new(AtomicBool::new(false));

    let mut listener = Listener::new(
        bus,
        catalog.clone(),
        state_db.clone(),
        registry.clone(),
        reporter.clone(),
        SystemClock,
        new_data.clone(),
        stopping.clone(),
        max_heartbeat_delay,
    );

    let loader = DataLoader::new(
        state_db,
        catalog,
        registry,
        reporter,
        WdbDriver::new(wdb.host, wdb.user),
        Wdb2TsDriver::new(wdb2ts.base_url, wdb2ts.services),
    );

    // Register interest before spawning so the listener's first notify_waiters
    // (sent once it starts consuming the bus) cannot be missed (§9).
    let startup_signal = new_data.notified();
    let listener_task = tokio::spawn(async move { listener.run().await });
    startup_signal.await;

    loader.populate_database_with_latest_events_from_server().await?;
    info!("Syncer is started");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        let notified = new_data.notified();
        loader.process().await?;
        tokio::select! {
            _ = notified => {}
            _ = sigterm.recv() => {
                info!("received SIGTERM, stopping");
                stopping.store(true, Ordering::SeqCst);
                new_data.notify_waiters();
            }
            _ = sigint.recv() => {
                info!("received SIGINT, stopping");
                stopping.store(true, Ordering::SeqCst);
                new_data.notify_waiters();
            }
        }
    }

    info!("Syncer is stopping");
    match listener_task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DaemonError::Engine(e)),
        Err(join_err) => {
            warn!(error = %join_err, "listener task ended abnormally");
            Ok(())
        }
    }
}

/// Confirm each configured model's product resolves before starting the
/// listener, so a catalog that is unreachable at startup exits 3 rather
/// than surfacing as a confusing run-loop failure later (§7).
async fn check_catalog_reachable(
    catalog: &Arc<HttpCatalogClient>,
    registry: &sy_core::ModelRegistry,
) -> Result<(), DaemonError> {
    for model in registry.iter() {
        catalog.product(&model.product).await.map_err(DaemonError::ConnectProductstatus)?;
    }
    Ok(())
}
