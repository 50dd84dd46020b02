//! Service initialization and foreground run loop.

use crate::app::connectivity_probe::spawn_connectivity_probe;
use crate::app::ServiceState;
use squadlink_config_and_utils::{Config, Paths};
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Run the service until Ctrl-C.
pub async fn run_service(config: Config, paths: Paths) -> Result<(), Box<dyn std::error::Error>> {
    let pid_file = paths.pid_file();
    if pid_file.exists() {
        warn!(path = %pid_file.display(), "Removing stale PID file");
        let _ = std::fs::remove_file(&pid_file);
    }

    info!("Starting Squadlink service");
    info!(
        api_url = %config.api_url,
        has_token = config.api_token.is_some(),
        flush_interval_secs = config.queue.flush_interval_secs,
        monitor_interval_secs = config.check_in.monitor_interval_secs,
        "Configuration loaded"
    );

    let state = ServiceState::build(config, paths)?;

    let pid = std::process::id();
    std::fs::write(state.paths.pid_file(), pid.to_string())?;
    info!(pid = pid, "Service started");

    state.queue.start().await;
    state.check_ins.start().await;

    let (probe_shutdown_tx, probe_shutdown_rx) = oneshot::channel();
    let probe = spawn_connectivity_probe(
        state.config.api_url.clone(),
        state.config.connectivity.probe_interval(),
        state.connectivity.clone(),
        probe_shutdown_rx,
    )?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let _ = probe_shutdown_tx.send(());
    if let Err(e) = probe.await {
        warn!(error = %e, "Connectivity probe task ended abnormally");
    }

    state.queue.shutdown();
    state.check_ins.cleanup();

    let status = state.queue.status().await;
    info!(
        queued = status.total,
        failed = status.failed,
        active_check_ins = state.check_ins.has_active_check_in().await,
        "Service stopped"
    );

    let _ = std::fs::remove_file(state.paths.pid_file());
    Ok(())
}
