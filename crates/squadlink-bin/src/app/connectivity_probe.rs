//! API reachability probe feeding the connectivity monitor.

use device_signals::ConnectivityMonitor;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Any HTTP response counts as reachable; only transport failures mean offline.
pub(crate) async fn probe_once(client: &Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) => {
            debug!(status = %response.status(), "Connectivity probe answered");
            true
        }
        Err(e) => {
            debug!(error = %e, "Connectivity probe failed");
            false
        }
    }
}

/// Spawn the probe loop. The first probe runs immediately.
pub(crate) fn spawn_connectivity_probe(
    api_url: String,
    interval: Duration,
    monitor: Arc<ConnectivityMonitor>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<JoinHandle<()>, reqwest::Error> {
    let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;

    Ok(tokio::spawn(async move {
        let mut delay = Duration::ZERO;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Connectivity probe received shutdown signal");
                    break;
                }
                _ = sleep(delay) => {
                    let reachable = probe_once(&client, &api_url).await;
                    monitor.set_connected(reachable);
                    delay = interval;
                }
            }
        }

        debug!("Connectivity probe task stopped");
    }))
}
