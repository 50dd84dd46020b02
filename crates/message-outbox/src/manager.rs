//! Offline message queue manager.
//!
//! Owns the queue of undelivered messages and flushes it on three triggers:
//! right after an enqueue while online, on a periodic timer that only runs
//! while the queue is non-empty, and when connectivity is restored.

use crate::{
    MessageSender, MessageStatus, NewQueuedMessage, OutboxError, OutboxResult, QueuedMessage,
};
use device_signals::{AnalyticsSink, Clock, ConnectivitySignal, SystemClock, TracingAnalytics};
use squadlink_storage::{DurableStore, StorageKeys};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default period of the flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of recorded failures before a message stops being retried automatically.
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 3;

/// Queue behavior settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub flush_interval: Duration,
    pub max_send_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_send_attempts: DEFAULT_MAX_SEND_ATTEMPTS,
        }
    }
}

/// Collaborators the queue talks to.
pub struct QueuePorts {
    pub store: Arc<dyn DurableStore>,
    pub sender: Arc<dyn MessageSender>,
    pub connectivity: Arc<dyn ConnectivitySignal>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub clock: Arc<dyn Clock>,
}

impl QueuePorts {
    /// Ports with log-only analytics and the system clock.
    pub fn new(
        store: Arc<dyn DurableStore>,
        sender: Arc<dyn MessageSender>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> Self {
        Self {
            store,
            sender,
            connectivity,
            analytics: Arc::new(TracingAnalytics),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Result of a `process_queue` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Another flush was already running; nothing was done.
    AlreadySyncing,
    /// No connectivity; nothing was done.
    Offline,
    /// Nothing queued.
    Empty,
    /// A full pass ran.
    Completed(FlushReport),
}

/// Per-pass counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    pub failed: usize,
    /// Stuck messages left untouched.
    pub skipped: usize,
}

/// Snapshot of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatus {
    pub total: usize,
    pub pending: usize,
    pub sending: usize,
    pub failed: usize,
    /// Failed messages that need a manual retry or removal.
    pub stuck: usize,
    pub is_syncing: bool,
}

struct QueueState {
    messages: Vec<QueuedMessage>,
    failed_message_count: usize,
}

struct QueueInner {
    config: QueueConfig,
    ports: QueuePorts,
    state: Mutex<QueueState>,
    is_syncing: AtomicBool,
    flush_timer: parking_lot::Mutex<Option<JoinHandle<()>>>,
    connectivity_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        if let Some(handle) = self.flush_timer.get_mut().take() {
            handle.abort();
        }
        if let Some(handle) = self.connectivity_task.get_mut().take() {
            handle.abort();
        }
    }
}

/// Clears the single-flight flag when a flush ends, however it ends.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Durable queue of outbound messages.
///
/// Cloning is cheap; clones share the same queue.
#[derive(Clone)]
pub struct MessageQueueManager {
    inner: Arc<QueueInner>,
}

impl MessageQueueManager {
    /// Create the manager and restore the persisted queue.
    ///
    /// Messages persisted mid-send are put back to `pending`. Timers and the
    /// connectivity subscription start with [`start`](Self::start).
    pub fn new(config: QueueConfig, ports: QueuePorts) -> OutboxResult<Self> {
        if config.flush_interval.is_zero() {
            return Err(OutboxError::InvalidConfig(
                "flush_interval must be greater than zero".to_string(),
            ));
        }

        let messages = load_queue(ports.store.as_ref())?;
        let failed_message_count = count_failed(&messages);

        if !messages.is_empty() {
            info!(
                count = messages.len(),
                failed = failed_message_count,
                "Restored offline message queue"
            );
        }

        Ok(Self {
            inner: Arc::new(QueueInner {
                config,
                ports,
                state: Mutex::new(QueueState {
                    messages,
                    failed_message_count,
                }),
                is_syncing: AtomicBool::new(false),
                flush_timer: parking_lot::Mutex::new(None),
                connectivity_task: parking_lot::Mutex::new(None),
            }),
        })
    }

    /// Subscribe to connectivity restores and resume flushing a restored queue.
    pub async fn start(&self) {
        let has_messages = {
            let state = self.inner.state.lock().await;
            if !state.messages.is_empty() {
                self.start_flush_timer();
            }
            !state.messages.is_empty()
        };

        self.spawn_connectivity_listener();

        if has_messages && self.inner.ports.connectivity.is_connected() {
            self.spawn_flush();
        }
    }

    /// Stop the flush timer and the connectivity subscription.
    ///
    /// In-flight sends are not cancelled.
    pub fn shutdown(&self) {
        self.stop_flush_timer();
        if let Some(handle) = self.inner.connectivity_task.lock().take() {
            handle.abort();
        }
        debug!("Message queue background tasks stopped");
    }

    /// Enqueue a message. Never fails; returns the new message id.
    pub async fn queue_message(&self, new: NewQueuedMessage) -> String {
        let message = QueuedMessage::new(new, self.inner.ports.clock.now());
        let id = message.id.clone();
        let kind = if message.is_image() { "image" } else { "text" };
        let match_id = message.match_id.clone();

        {
            let mut state = self.inner.state.lock().await;
            let was_empty = state.messages.is_empty();
            state.messages.push(message);
            self.persist(&state.messages);
            if was_empty {
                self.start_flush_timer();
            }
            debug!(
                message_id = %id,
                queue_len = state.messages.len(),
                "Message queued"
            );
        }

        self.inner
            .ports
            .analytics
            .log_event("message_queued", &[("kind", kind), ("match_id", match_id.as_str())]);

        if self.inner.ports.connectivity.is_connected() {
            self.spawn_flush();
        }

        id
    }

    /// Run one flush pass over the queue.
    ///
    /// Returns without doing anything when a pass is already running, when
    /// offline, or when the queue is empty. Otherwise every message is
    /// attempted once in enqueue order, except stuck ones.
    pub async fn process_queue(&self) -> FlushOutcome {
        if self
            .inner
            .is_syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Flush already in progress");
            return FlushOutcome::AlreadySyncing;
        }
        let _guard = SyncGuard(&self.inner.is_syncing);

        if !self.inner.ports.connectivity.is_connected() {
            debug!("Skipping flush (offline)");
            return FlushOutcome::Offline;
        }

        // Work from a snapshot of ids so removals during the pass never
        // shift what is visited next.
        let ids: Vec<String> = {
            let state = self.inner.state.lock().await;
            state.messages.iter().map(|m| m.id.clone()).collect()
        };
        if ids.is_empty() {
            return FlushOutcome::Empty;
        }

        let max_attempts = self.inner.config.max_send_attempts;
        let mut report = FlushReport::default();

        for id in ids {
            let attempt = {
                let mut state = self.inner.state.lock().await;
                let Some(message) = state.messages.iter_mut().find(|m| m.id == id) else {
                    // Removed while an earlier message was in flight
                    continue;
                };
                if message.is_stuck(max_attempts) {
                    report.skipped += 1;
                    continue;
                }
                message.status = MessageStatus::Sending;
                message.clone()
            };

            match self.deliver(&attempt).await {
                Ok(()) => {
                    let mut state = self.inner.state.lock().await;
                    state.messages.retain(|m| m.id != id);
                    report.sent += 1;
                    debug!(message_id = %id, "Queued message delivered");
                    self.inner.ports.analytics.log_event(
                        "queued_message_sent",
                        &[
                            ("match_id", attempt.match_id.as_str()),
                            ("retry_count", attempt.retry_count.to_string().as_str()),
                        ],
                    );
                }
                Err(e) => {
                    let error = e.to_string();
                    let mut state = self.inner.state.lock().await;
                    let Some(message) = state.messages.iter_mut().find(|m| m.id == id) else {
                        debug!(
                            message_id = %id,
                            error = %error,
                            "Message removed during its send"
                        );
                        continue;
                    };
                    message.record_failure(error.clone());
                    warn!(
                        message_id = %id,
                        retry_count = message.retry_count,
                        error = %error,
                        "Queued message send failed"
                    );
                    if message.is_stuck(max_attempts) {
                        warn!(
                            message_id = %id,
                            "Message reached the retry limit and needs a manual retry"
                        );
                    }
                    report.failed += 1;
                    self.inner.ports.analytics.log_event(
                        "queued_message_failed",
                        &[("match_id", attempt.match_id.as_str()), ("error", error.as_str())],
                    );
                }
            }
        }

        let mut state = self.inner.state.lock().await;
        state.failed_message_count = count_failed(&state.messages);
        self.persist(&state.messages);
        if state.messages.is_empty() {
            self.stop_flush_timer();
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            remaining = state.messages.len(),
            "Flush pass finished"
        );

        FlushOutcome::Completed(report)
    }

    /// Give every failed message a fresh set of attempts, then flush.
    pub async fn retry_failed_messages(&self) -> FlushOutcome {
        let reset = {
            let mut state = self.inner.state.lock().await;
            let mut reset = 0usize;
            for message in state
                .messages
                .iter_mut()
                .filter(|m| m.status == MessageStatus::Failed)
            {
                message.reset_for_retry();
                reset += 1;
            }
            state.failed_message_count = count_failed(&state.messages);
            self.persist(&state.messages);
            if !state.messages.is_empty() {
                self.start_flush_timer();
            }
            reset
        };

        info!(count = reset, "Failed messages reset for retry");
        self.inner
            .ports
            .analytics
            .log_event("failed_messages_retried", &[("count", reset.to_string().as_str())]);

        self.process_queue().await
    }

    /// Remove a single message regardless of its state.
    ///
    /// Returns whether a message with that id existed.
    pub async fn remove_message(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        let before = state.messages.len();
        state.messages.retain(|m| m.id != id);
        let removed = state.messages.len() != before;

        state.failed_message_count = count_failed(&state.messages);
        self.persist(&state.messages);
        if state.messages.is_empty() {
            self.stop_flush_timer();
        }

        debug!(message_id = %id, removed, "Remove message");
        removed
    }

    /// Drop every queued message.
    pub async fn clear_queue(&self) {
        let mut state = self.inner.state.lock().await;
        let dropped = state.messages.len();
        state.messages.clear();
        state.failed_message_count = 0;
        self.persist(&state.messages);
        self.stop_flush_timer();

        info!(count = dropped, "Message queue cleared");
        self.inner
            .ports
            .analytics
            .log_event("message_queue_cleared", &[("count", dropped.to_string().as_str())]);
    }

    /// Copy of the queue in enqueue order.
    pub async fn messages(&self) -> Vec<QueuedMessage> {
        self.inner.state.lock().await.messages.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of messages in `failed` state as of the last mutation.
    pub async fn failed_message_count(&self) -> usize {
        self.inner.state.lock().await.failed_message_count
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.is_syncing.load(Ordering::Acquire)
    }

    pub fn is_flush_timer_running(&self) -> bool {
        self.inner
            .flush_timer
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn status(&self) -> QueueStatus {
        let max_attempts = self.inner.config.max_send_attempts;
        let state = self.inner.state.lock().await;
        let mut status = QueueStatus {
            total: state.messages.len(),
            is_syncing: self.is_syncing(),
            ..Default::default()
        };
        for message in &state.messages {
            match message.status {
                MessageStatus::Pending => status.pending += 1,
                MessageStatus::Sending => status.sending += 1,
                MessageStatus::Failed => status.failed += 1,
            }
            if message.is_stuck(max_attempts) {
                status.stuck += 1;
            }
        }
        status
    }

    async fn deliver(&self, message: &QueuedMessage) -> OutboxResult<()> {
        let sender = &self.inner.ports.sender;
        match &message.image_url {
            Some(image_url) => {
                sender
                    .send_image_message(
                        &message.match_id,
                        &message.sender_id,
                        &message.receiver_id,
                        image_url,
                        message.caption(),
                    )
                    .await
            }
            None => {
                sender
                    .send_text_message(
                        &message.match_id,
                        &message.sender_id,
                        &message.receiver_id,
                        &message.text,
                    )
                    .await
            }
        }
    }

    fn persist(&self, messages: &[QueuedMessage]) {
        let bytes = match serde_json::to_vec(messages) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize message queue");
                return;
            }
        };
        if let Err(e) = self
            .inner
            .ports
            .store
            .save(StorageKeys::MESSAGE_QUEUE, &bytes)
        {
            warn!(error = %e, "Failed to persist message queue");
        }
    }

    fn spawn_flush(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            manager.process_queue().await;
        });
    }

    /// Callers hold the state lock so timer state always matches queue emptiness.
    fn start_flush_timer(&self) {
        let mut slot = self.inner.flush_timer.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let period = self.inner.config.flush_interval;
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                // Detached so stopping the timer never cuts a pass short
                MessageQueueManager { inner }.spawn_flush();
            }
        }));

        debug!(interval_secs = period.as_secs(), "Flush timer started");
    }

    fn stop_flush_timer(&self) {
        if let Some(handle) = self.inner.flush_timer.lock().take() {
            handle.abort();
            debug!("Flush timer stopped");
        }
    }

    fn spawn_connectivity_listener(&self) {
        let mut slot = self.inner.connectivity_task.lock();
        if slot.is_some() {
            return;
        }

        let mut rx = self.inner.ports.connectivity.subscribe();
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let connected = *rx.borrow_and_update();
                if !connected {
                    continue;
                }
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                info!("Connection restored, flushing message queue");
                MessageQueueManager { inner }.spawn_flush();
            }
        }));
    }
}

fn load_queue(store: &dyn DurableStore) -> OutboxResult<Vec<QueuedMessage>> {
    let Some(bytes) = store.load(StorageKeys::MESSAGE_QUEUE)? else {
        return Ok(Vec::new());
    };
    let mut messages: Vec<QueuedMessage> = serde_json::from_slice(&bytes)?;

    let mut recovered = 0usize;
    for message in messages
        .iter_mut()
        .filter(|m| m.status == MessageStatus::Sending)
    {
        message.status = MessageStatus::Pending;
        recovered += 1;
    }
    if recovered > 0 {
        info!(count = recovered, "Recovered interrupted sends to pending");
    }

    Ok(messages)
}

fn count_failed(messages: &[QueuedMessage]) -> usize {
    messages
        .iter()
        .filter(|m| m.status == MessageStatus::Failed)
        .count()
}
