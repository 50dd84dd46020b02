//! Connectivity status.

use tokio::sync::watch;
use tracing::info;

/// Read-only view of network reachability.
pub trait ConnectivitySignal: Send + Sync {
    /// Whether the device is connected right now.
    fn is_connected(&self) -> bool;

    /// Subscribe to status changes.
    ///
    /// The receiver observes every transition; a change to `true` is the
    /// "connection restored" event.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity state fed by whoever can observe the network
/// (a reachability probe, an OS callback, or a test).
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_connected: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_connected);
        Self { tx }
    }

    /// Record the current status. Subscribers are only woken on an actual change.
    ///
    /// Returns `true` when the status changed.
    pub fn set_connected(&self, connected: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            if connected {
                info!("Connectivity restored");
            } else {
                info!("Connectivity lost");
            }
        }
        changed
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ConnectivitySignal for ConnectivityMonitor {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
