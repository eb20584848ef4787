//! kvqueue daemon - Main Entry Point
//!
//! Opens the store, recovers queue state and serves JSON-RPC until Ctrl+C.

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use config::DaemonConfig;
use kvqueue_api_rpc::RpcServer;
use kvqueue_core::application::{QueueEngine, RecoveryService};
use kvqueue_core::port::{BucketStore, SystemTimeProvider, TimestampIdProvider};
use kvqueue_infra_sqlite::{open_store, StoreConfig};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::from_env()?;
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;

    info!("kvqueue v{} starting...", kvqueue_core::VERSION);

    // 2. Open store
    let store = Arc::new(
        open_store(&StoreConfig::new(&config.db_path, config.ephemeral))
            .await
            .with_context(|| format!("Failed to open store at {}", config.db_path))?,
    );
    let store_port: Arc<dyn BucketStore> = store.clone();

    // 3. Recover queue registry
    info!(strict = config.strict_recovery, "Running startup recovery...");
    let (registry, report) = RecoveryService::new(store_port.clone(), config.strict_recovery)
        .recover()
        .await
        .context("Startup recovery failed")?;

    info!(
        loaded = report.loaded,
        skipped = report.skipped.len(),
        reconciled = report.reconciled.len(),
        orphans_removed = report.orphans_removed.len(),
        "Recovery completed"
    );
    if !report.skipped.is_empty() {
        warn!(queues = ?report.skipped, "Undecodable queue records were left in place");
    }

    // 4. Wire the engine
    let engine = Arc::new(QueueEngine::new(
        store_port,
        registry,
        Arc::new(TimestampIdProvider::resuming_after(
            report.newest_message_id.as_deref(),
        )),
        Arc::new(SystemTimeProvider),
    ));

    // 5. Start JSON-RPC server
    let (addr, rpc_handle) = RpcServer::new(config.rpc.clone(), engine)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(%addr, "System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, rpc_handle.stopped())
        .await
        .is_err()
    {
        warn!("RPC server did not stop within {:?}", SHUTDOWN_TIMEOUT);
    }
    store.close().await;

    info!("Shutdown complete.");

    Ok(())
}
