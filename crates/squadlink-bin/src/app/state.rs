//! Service state definition.

use device_signals::{ConnectivityMonitor, TracingAnalytics};
use message_outbox::{
    HttpMessageSender, MessageQueueManager, QueueConfig, QueuePorts, SenderConfig,
};
use session_checkin_monitor::{
    CheckInConfig, CheckInPorts, SessionCheckInManager, TracingEmergencyNotifier,
    TracingReminderScheduler,
};
use squadlink_config_and_utils::{Config, Paths};
use squadlink_storage::FileStore;
use std::sync::Arc;

/// Shared service state.
#[derive(Clone)]
pub struct ServiceState {
    pub config: Arc<Config>,
    pub paths: Arc<Paths>,
    /// Fed by the connectivity probe while the service runs.
    pub connectivity: Arc<ConnectivityMonitor>,
    pub queue: MessageQueueManager,
    pub check_ins: SessionCheckInManager,
}

impl ServiceState {
    /// Open the store under `paths` and build both managers from `config`.
    ///
    /// Nothing is started; callers decide whether to run timers.
    pub fn build(config: Config, paths: Paths) -> Result<Self, Box<dyn std::error::Error>> {
        paths.ensure_dirs()?;
        let store = Arc::new(FileStore::open(paths.store_dir())?);
        let connectivity = Arc::new(ConnectivityMonitor::new(false));
        let analytics = Arc::new(TracingAnalytics);

        let sender = Arc::new(HttpMessageSender::new(
            SenderConfig {
                api_url: config.api_url.clone(),
                timeout: config.queue.request_timeout(),
            },
            config.api_token.clone(),
        )?);

        let queue = MessageQueueManager::new(
            QueueConfig {
                flush_interval: config.queue.flush_interval(),
                max_send_attempts: config.queue.max_send_attempts,
            },
            QueuePorts::new(store.clone(), sender, connectivity.clone())
                .with_analytics(analytics.clone()),
        )?;

        let check_ins = SessionCheckInManager::new(
            CheckInConfig {
                monitor_interval: config.check_in.monitor_interval(),
                grace_period: config.check_in.grace_period(),
            },
            CheckInPorts::new(
                store,
                Arc::new(TracingReminderScheduler),
                Arc::new(TracingEmergencyNotifier),
            )
            .with_analytics(analytics),
        )?;

        Ok(Self {
            config: Arc::new(config),
            paths: Arc::new(paths),
            connectivity,
            queue,
            check_ins,
        })
    }
}
