//! Session check-in manager.
//!
//! Check-ins live in exactly one of three collections:
//! - **scheduled**: created, not yet started
//! - **active**: being monitored, including raised emergencies
//! - **past**: completed or cancelled, most recent first
//!
//! Every mutation is written through to the durable store.

use crate::monitor::{evaluate_deadline, DeadlineState, MonitorTick};
use crate::{
    AlertKind, CheckInError, CheckInResult, CheckInStatus, ContactAlert, EmergencyNotifier,
    NewCheckIn, ReminderScheduler, SessionCheckIn, DEFAULT_GRACE_PERIOD, DEFAULT_MONITOR_INTERVAL,
};
use device_signals::{AnalyticsSink, Clock, SystemClock, TracingAnalytics};
use serde::{Deserialize, Serialize};
use squadlink_storage::{DurableStore, StorageKeys};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Monitoring settings.
#[derive(Debug, Clone)]
pub struct CheckInConfig {
    pub monitor_interval: Duration,
    pub grace_period: Duration,
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Collaborators the manager talks to.
pub struct CheckInPorts {
    pub store: Arc<dyn DurableStore>,
    pub reminders: Arc<dyn ReminderScheduler>,
    pub notifier: Arc<dyn EmergencyNotifier>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub clock: Arc<dyn Clock>,
}

impl CheckInPorts {
    /// Ports with log-only analytics and the system clock.
    pub fn new(
        store: Arc<dyn DurableStore>,
        reminders: Arc<dyn ReminderScheduler>,
        notifier: Arc<dyn EmergencyNotifier>,
    ) -> Self {
        Self {
            store,
            reminders,
            notifier,
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

/// Persisted shape of the three collections.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckInCollections {
    #[serde(default)]
    scheduled: Vec<SessionCheckIn>,
    #[serde(default)]
    active: Vec<SessionCheckIn>,
    #[serde(default)]
    past: Vec<SessionCheckIn>,
}

struct CheckInState {
    collections: CheckInCollections,
    /// Check-ins whose contacts already got the overdue warning.
    overdue_warned: HashSet<String>,
}

struct ManagerInner {
    config: CheckInConfig,
    ports: CheckInPorts,
    state: Mutex<CheckInState>,
    monitors: parking_lot::Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        for (_, handle) in self.monitors.get_mut().drain() {
            handle.abort();
        }
    }
}

/// Registry and state machine for safety check-ins.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct SessionCheckInManager {
    inner: Arc<ManagerInner>,
}

impl SessionCheckInManager {
    /// Create the manager and restore persisted check-ins.
    ///
    /// Monitoring of restored active check-ins resumes with
    /// [`start`](Self::start).
    pub fn new(config: CheckInConfig, ports: CheckInPorts) -> CheckInResult<Self> {
        if config.monitor_interval.is_zero() {
            return Err(CheckInError::InvalidConfig(
                "monitor_interval must be greater than zero".to_string(),
            ));
        }

        let collections = match ports.store.load(StorageKeys::SESSION_CHECK_INS)? {
            Some(bytes) => serde_json::from_slice::<CheckInCollections>(&bytes)?,
            None => CheckInCollections::default(),
        };

        info!(
            scheduled = collections.scheduled.len(),
            active = collections.active.len(),
            past = collections.past.len(),
            "Loaded session check-ins"
        );

        Ok(Self {
            inner: Arc::new(ManagerInner {
                config,
                ports,
                state: Mutex::new(CheckInState {
                    collections,
                    overdue_warned: HashSet::new(),
                }),
                monitors: parking_lot::Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Resume monitoring for every restored check-in still in `active` status.
    pub async fn start(&self) {
        let state = self.inner.state.lock().await;
        for check_in in state
            .collections
            .active
            .iter()
            .filter(|c| c.status == CheckInStatus::Active)
        {
            self.start_monitoring(&check_in.id);
        }
    }

    pub async fn schedule_check_in(&self, new: NewCheckIn) -> CheckInResult<SessionCheckIn> {
        let now = self.inner.ports.clock.now();
        if new.scheduled_time <= now {
            return Err(CheckInError::InvalidData(
                "scheduled time must be in the future".to_string(),
            ));
        }
        if new.check_in_time <= new.scheduled_time {
            return Err(CheckInError::InvalidData(
                "check-in time must be after the scheduled time".to_string(),
            ));
        }

        let check_in = SessionCheckIn::new(new, now);
        {
            let mut state = self.inner.state.lock().await;
            state.collections.scheduled.push(check_in.clone());
            self.persist(&state.collections);
        }

        self.inner.ports.reminders.schedule_reminder(&check_in);
        info!(
            check_in_id = %check_in.id,
            scheduled_time = %check_in.scheduled_time,
            check_in_time = %check_in.check_in_time,
            "Check-in scheduled"
        );
        self.inner.ports.analytics.log_event(
            "check_in_scheduled",
            &[
                ("check_in_id", check_in.id.as_str()),
                ("contacts", check_in.emergency_contacts.len().to_string().as_str()),
            ],
        );

        Ok(check_in)
    }

    pub async fn start_check_in(&self, id: &str) -> CheckInResult<()> {
        let mut state = self.inner.state.lock().await;
        let index = position(&state.collections.scheduled, id)
            .ok_or_else(|| CheckInError::NotFound(id.to_string()))?;

        let mut check_in = state.collections.scheduled.remove(index);
        check_in.status = CheckInStatus::Active;
        check_in.activated_at = Some(self.inner.ports.clock.now());
        state.collections.active.push(check_in.clone());
        self.persist(&state.collections);

        self.start_monitoring(id);
        self.notify_contacts(AlertKind::MonitoringStarted, &check_in);

        info!(check_in_id = %id, "Check-in started");
        self.inner
            .ports
            .analytics
            .log_event("check_in_started", &[("check_in_id", id)]);
        Ok(())
    }

    pub async fn complete_check_in(&self, id: &str) -> CheckInResult<()> {
        let mut state = self.inner.state.lock().await;
        let index = position(&state.collections.active, id)
            .ok_or_else(|| CheckInError::NotFound(id.to_string()))?;

        let mut check_in = state.collections.active.remove(index);
        let previous = check_in.status;
        check_in.status = CheckInStatus::Completed;
        check_in.completed_at = Some(self.inner.ports.clock.now());
        state.collections.past.insert(0, check_in.clone());
        state.overdue_warned.remove(id);
        self.persist(&state.collections);

        self.stop_monitoring(id);
        self.inner.ports.reminders.cancel_reminders(id);
        self.notify_contacts(AlertKind::CompletedSafely, &check_in);

        info!(
            check_in_id = %id,
            from = previous.as_str(),
            has_active = !state.collections.active.is_empty(),
            "Check-in completed"
        );
        self.inner
            .ports
            .analytics
            .log_event("check_in_completed", &[("check_in_id", id)]);
        Ok(())
    }

    pub async fn cancel_check_in(&self, id: &str) -> CheckInResult<()> {
        let mut state = self.inner.state.lock().await;

        let (mut check_in, was_active) =
            if let Some(index) = position(&state.collections.scheduled, id) {
                (state.collections.scheduled.remove(index), false)
            } else if let Some(index) = position(&state.collections.active, id) {
                (state.collections.active.remove(index), true)
            } else {
                return Err(CheckInError::NotFound(id.to_string()));
            };

        check_in.status = CheckInStatus::Cancelled;
        state.collections.past.insert(0, check_in);
        state.overdue_warned.remove(id);
        self.persist(&state.collections);

        if was_active {
            self.stop_monitoring(id);
        }
        self.inner.ports.reminders.cancel_reminders(id);

        info!(check_in_id = %id, was_active, "Check-in cancelled");
        self.inner.ports.analytics.log_event(
            "check_in_cancelled",
            &[("check_in_id", id), ("was_active", bool_str(was_active))],
        );
        Ok(())
    }

    /// Raise an emergency for an active check-in and alert every contact.
    ///
    /// The check-in stays in the active collection and monitoring stops.
    pub async fn trigger_emergency(&self, id: &str) -> CheckInResult<()> {
        let mut state = self.inner.state.lock().await;
        self.escalate(&mut state, id)
    }

    /// Run one monitoring tick for `id`.
    ///
    /// Called by the per-check-in timer; public so callers can force an
    /// immediate evaluation.
    pub async fn check_overdue(&self, id: &str) -> MonitorTick {
        let now = self.inner.ports.clock.now();
        let mut state = self.inner.state.lock().await;

        let Some(check_in) = state
            .collections
            .active
            .iter()
            .find(|c| c.id == id && c.status == CheckInStatus::Active)
            .cloned()
        else {
            self.stop_monitoring(id);
            return MonitorTick::Inactive;
        };

        let deadline = evaluate_deadline(check_in.check_in_time, now, self.inner.config.grace_period);
        if deadline == DeadlineState::OnTime {
            return MonitorTick::OnTime;
        }

        if state.overdue_warned.insert(id.to_string()) {
            warn!(
                check_in_id = %id,
                check_in_time = %check_in.check_in_time,
                "Check-in overdue"
            );
            self.notify_contacts(AlertKind::Overdue, &check_in);
            self.inner
                .ports
                .analytics
                .log_event("check_in_overdue", &[("check_in_id", id)]);
        }

        if deadline == DeadlineState::PastGrace {
            // Present and active, checked above under the same lock
            if let Err(e) = self.escalate(&mut state, id) {
                warn!(check_in_id = %id, error = %e, "Automatic escalation failed");
                return MonitorTick::Inactive;
            }
            return MonitorTick::Escalated;
        }

        MonitorTick::Overdue
    }

    /// Stop every monitoring timer. Persisted state is untouched.
    pub fn cleanup(&self) {
        let mut monitors = self.inner.monitors.lock();
        let count = monitors.len();
        for (_, handle) in monitors.drain() {
            handle.abort();
        }
        debug!(count, "Check-in monitors stopped");
    }

    pub async fn has_active_check_in(&self) -> bool {
        !self.inner.state.lock().await.collections.active.is_empty()
    }

    pub async fn scheduled(&self) -> Vec<SessionCheckIn> {
        self.inner.state.lock().await.collections.scheduled.clone()
    }

    pub async fn active(&self) -> Vec<SessionCheckIn> {
        self.inner.state.lock().await.collections.active.clone()
    }

    /// Completed and cancelled check-ins, most recent first.
    pub async fn past(&self) -> Vec<SessionCheckIn> {
        self.inner.state.lock().await.collections.past.clone()
    }

    pub async fn get(&self, id: &str) -> Option<SessionCheckIn> {
        let state = self.inner.state.lock().await;
        let collections = &state.collections;
        collections
            .scheduled
            .iter()
            .chain(&collections.active)
            .chain(&collections.past)
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn is_monitoring(&self, id: &str) -> bool {
        self.inner
            .monitors
            .lock()
            .get(id)
            .is_some_and(|h| !h.is_finished())
    }

    pub fn monitored_count(&self) -> usize {
        self.inner
            .monitors
            .lock()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }

    fn escalate(&self, state: &mut CheckInState, id: &str) -> CheckInResult<()> {
        let check_in = state
            .collections
            .active
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CheckInError::NotFound(id.to_string()))?;

        check_in.status = CheckInStatus::Emergency;
        let check_in = check_in.clone();
        self.persist(&state.collections);

        self.stop_monitoring(id);
        self.notify_contacts(AlertKind::Emergency, &check_in);

        warn!(
            check_in_id = %id,
            member = %check_in.squad_member_name,
            location = %check_in.location,
            contacts = check_in.emergency_contacts.len(),
            "Emergency triggered"
        );
        self.inner
            .ports
            .analytics
            .log_event("check_in_emergency", &[("check_in_id", id)]);
        Ok(())
    }

    fn notify_contacts(&self, kind: AlertKind, check_in: &SessionCheckIn) {
        let alert = ContactAlert::for_check_in(kind, check_in);
        for contact in &check_in.emergency_contacts {
            self.inner.ports.notifier.notify(contact, &alert);
        }
    }

    fn persist(&self, collections: &CheckInCollections) {
        let bytes = match serde_json::to_vec(collections) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize check-ins");
                return;
            }
        };
        if let Err(e) = self
            .inner
            .ports
            .store
            .save(StorageKeys::SESSION_CHECK_INS, &bytes)
        {
            warn!(error = %e, "Failed to persist check-ins");
        }
    }

    fn start_monitoring(&self, id: &str) {
        let period = self.inner.config.monitor_interval;
        let weak = Arc::downgrade(&self.inner);
        let task_id = id.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let tick = SessionCheckInManager { inner }.check_overdue(&task_id).await;
                if matches!(tick, MonitorTick::Inactive | MonitorTick::Escalated) {
                    break;
                }
            }
        });

        if let Some(previous) = self.inner.monitors.lock().insert(id.to_string(), handle) {
            previous.abort();
        }
        debug!(check_in_id = %id, interval_secs = period.as_secs(), "Monitoring started");
    }

    fn stop_monitoring(&self, id: &str) {
        if let Some(handle) = self.inner.monitors.lock().remove(id) {
            handle.abort();
            debug!(check_in_id = %id, "Monitoring stopped");
        }
    }
}

fn position(check_ins: &[SessionCheckIn], id: &str) -> Option<usize> {
    check_ins.iter().position(|c| c.id == id)
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmergencyContact;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use device_signals::ManualClock;
    use squadlink_storage::MemoryStore;

    #[derive(Default)]
    struct RecordingNotifier {
        alerts: parking_lot::Mutex<Vec<(String, AlertKind)>>,
    }

    impl RecordingNotifier {
        fn kinds(&self) -> Vec<AlertKind> {
            self.alerts.lock().iter().map(|(_, kind)| *kind).collect()
        }

        fn count(&self, kind: AlertKind) -> usize {
            self.alerts.lock().iter().filter(|(_, k)| *k == kind).count()
        }
    }

    impl EmergencyNotifier for RecordingNotifier {
        fn notify(&self, contact: &EmergencyContact, alert: &ContactAlert) {
            self.alerts.lock().push((contact.name.clone(), alert.kind));
        }
    }

    #[derive(Default)]
    struct RecordingReminders {
        scheduled: parking_lot::Mutex<Vec<String>>,
        cancelled: parking_lot::Mutex<Vec<String>>,
    }

    impl ReminderScheduler for RecordingReminders {
        fn schedule_reminder(&self, check_in: &SessionCheckIn) {
            self.scheduled.lock().push(check_in.id.clone());
        }

        fn cancel_reminders(&self, check_in_id: &str) {
            self.cancelled.lock().push(check_in_id.to_string());
        }
    }

    struct Harness {
        manager: SessionCheckInManager,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        reminders: Arc<RecordingReminders>,
    }

    fn harness_with_store(store: Arc<MemoryStore>, start: DateTime<Utc>) -> Harness {
        let clock = Arc::new(ManualClock::new(start));
        let notifier = Arc::new(RecordingNotifier::default());
        let reminders = Arc::new(RecordingReminders::default());
        let manager = SessionCheckInManager::new(
            CheckInConfig::default(),
            CheckInPorts::new(store.clone(), reminders.clone(), notifier.clone())
                .with_clock(clock.clone()),
        )
        .unwrap();
        Harness {
            manager,
            store,
            clock,
            notifier,
            reminders,
        }
    }

    fn harness() -> Harness {
        harness_with_store(Arc::new(MemoryStore::new()), Utc::now())
    }

    fn meetup(now: DateTime<Utc>) -> NewCheckIn {
        NewCheckIn {
            squad_member_id: "member-1".to_string(),
            squad_member_name: "Riley".to_string(),
            location: "Arcade on 5th".to_string(),
            scheduled_time: now + ChronoDuration::hours(1),
            check_in_time: now + ChronoDuration::hours(3),
            emergency_contacts: vec![
                EmergencyContact::phone("Sam", "+15550100"),
                EmergencyContact::email("Jo", "jo@example.com"),
            ],
        }
    }

    fn persisted(store: &MemoryStore) -> CheckInCollections {
        let bytes = store.load(StorageKeys::SESSION_CHECK_INS).unwrap().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_schedule_rejects_past_start() {
        let h = harness();
        let mut input = meetup(h.clock.now());
        input.scheduled_time = h.clock.now() - ChronoDuration::minutes(1);

        let err = h.manager.schedule_check_in(input).await.unwrap_err();

        assert!(matches!(err, CheckInError::InvalidData(_)));
        assert!(h.manager.scheduled().await.is_empty());
        assert!(h.store.load(StorageKeys::SESSION_CHECK_INS).unwrap().is_none());
        assert!(h.reminders.scheduled.lock().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_rejects_deadline_before_start() {
        let h = harness();
        let mut input = meetup(h.clock.now());
        input.check_in_time = input.scheduled_time;

        let err = h.manager.schedule_check_in(input).await.unwrap_err();

        assert!(matches!(err, CheckInError::InvalidData(_)));
        assert!(h.manager.scheduled().await.is_empty());
    }

    #[tokio::test]
    async fn test_schedule_persists_and_schedules_reminder() {
        let h = harness();

        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();

        assert_eq!(check_in.status, CheckInStatus::Scheduled);
        assert_eq!(check_in.created_at, h.clock.now());
        assert_eq!(h.manager.scheduled().await, vec![check_in.clone()]);
        assert_eq!(persisted(&h.store).scheduled, vec![check_in.clone()]);
        assert_eq!(*h.reminders.scheduled.lock(), vec![check_in.id]);
        assert!(!h.manager.has_active_check_in().await);
    }

    #[tokio::test]
    async fn test_start_unknown_id_is_not_found() {
        let h = harness();

        let err = h.manager.start_check_in("nope").await.unwrap_err();

        assert!(matches!(err, CheckInError::NotFound(_)));
        assert!(!h.manager.has_active_check_in().await);
    }

    #[tokio::test]
    async fn test_schedule_start_complete() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();

        h.clock.advance(ChronoDuration::hours(1));
        h.manager.start_check_in(&check_in.id).await.unwrap();

        assert!(h.manager.has_active_check_in().await);
        assert!(h.manager.scheduled().await.is_empty());
        let active = h.manager.active().await;
        assert_eq!(active[0].status, CheckInStatus::Active);
        assert_eq!(active[0].activated_at, Some(h.clock.now()));
        assert!(h.manager.is_monitoring(&check_in.id));
        assert_eq!(h.notifier.count(AlertKind::MonitoringStarted), 2);

        h.clock.advance(ChronoDuration::minutes(90));
        h.manager.complete_check_in(&check_in.id).await.unwrap();

        assert!(!h.manager.has_active_check_in().await);
        assert!(!h.manager.is_monitoring(&check_in.id));
        let past = h.manager.past().await;
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].status, CheckInStatus::Completed);
        assert_eq!(past[0].completed_at, Some(h.clock.now()));
        assert_eq!(h.notifier.count(AlertKind::CompletedSafely), 2);
        assert_eq!(persisted(&h.store).past, past);
    }

    #[tokio::test]
    async fn test_complete_requires_active() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();

        let err = h.manager.complete_check_in(&check_in.id).await.unwrap_err();

        assert!(matches!(err, CheckInError::NotFound(_)));
        assert_eq!(h.manager.scheduled().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_scheduled_and_active() {
        let h = harness();
        let first = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        let second = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.start_check_in(&second.id).await.unwrap();

        h.manager.cancel_check_in(&first.id).await.unwrap();
        h.manager.cancel_check_in(&second.id).await.unwrap();

        let past = h.manager.past().await;
        // Most recent first
        assert_eq!(past[0].id, second.id);
        assert_eq!(past[1].id, first.id);
        assert!(past.iter().all(|c| c.status == CheckInStatus::Cancelled));
        assert!(!h.manager.has_active_check_in().await);
        assert!(!h.manager.is_monitoring(&second.id));
        assert_eq!(*h.reminders.cancelled.lock(), vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_not_found() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.cancel_check_in(&check_in.id).await.unwrap();

        // Already in past
        let err = h.manager.cancel_check_in(&check_in.id).await.unwrap_err();
        assert!(matches!(err, CheckInError::NotFound(_)));

        let err = h.manager.cancel_check_in("missing").await.unwrap_err();
        assert!(matches!(err, CheckInError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_trigger_emergency_stays_active() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.start_check_in(&check_in.id).await.unwrap();

        h.manager.trigger_emergency(&check_in.id).await.unwrap();

        let active = h.manager.active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, CheckInStatus::Emergency);
        assert!(h.manager.has_active_check_in().await);
        assert!(h.manager.past().await.is_empty());
        assert!(!h.manager.is_monitoring(&check_in.id));
        assert_eq!(h.notifier.count(AlertKind::Emergency), 2);
        assert_eq!(persisted(&h.store).active[0].status, CheckInStatus::Emergency);
    }

    #[tokio::test]
    async fn test_emergency_can_be_resolved() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.start_check_in(&check_in.id).await.unwrap();
        h.manager.trigger_emergency(&check_in.id).await.unwrap();

        h.manager.complete_check_in(&check_in.id).await.unwrap();

        assert!(!h.manager.has_active_check_in().await);
        assert_eq!(h.manager.past().await[0].status, CheckInStatus::Completed);
    }

    #[tokio::test]
    async fn test_trigger_emergency_requires_active() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();

        let err = h.manager.trigger_emergency(&check_in.id).await.unwrap_err();

        assert!(matches!(err, CheckInError::NotFound(_)));
        assert!(h.notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_tick_before_deadline_does_nothing() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.start_check_in(&check_in.id).await.unwrap();
        let alerts_before = h.notifier.kinds().len();

        assert_eq!(h.manager.check_overdue(&check_in.id).await, MonitorTick::OnTime);
        assert_eq!(h.notifier.kinds().len(), alerts_before);
    }

    #[tokio::test]
    async fn test_overdue_warning_is_sent_once() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.start_check_in(&check_in.id).await.unwrap();

        h.clock.set(check_in.check_in_time + ChronoDuration::minutes(1));
        assert_eq!(h.manager.check_overdue(&check_in.id).await, MonitorTick::Overdue);
        h.clock.advance(ChronoDuration::minutes(1));
        assert_eq!(h.manager.check_overdue(&check_in.id).await, MonitorTick::Overdue);

        // Two contacts, one warning each
        assert_eq!(h.notifier.count(AlertKind::Overdue), 2);
        assert_eq!(h.manager.active().await[0].status, CheckInStatus::Active);
    }

    #[tokio::test]
    async fn test_tick_past_grace_escalates() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.start_check_in(&check_in.id).await.unwrap();

        h.clock.set(check_in.check_in_time + ChronoDuration::minutes(16));
        let tick = h.manager.check_overdue(&check_in.id).await;

        assert_eq!(tick, MonitorTick::Escalated);
        assert_eq!(h.manager.active().await[0].status, CheckInStatus::Emergency);
        assert!(h.notifier.count(AlertKind::Emergency) >= 1);
        assert!(!h.manager.is_monitoring(&check_in.id));

        // Further ticks see an emergency, not an active check-in
        assert_eq!(h.manager.check_overdue(&check_in.id).await, MonitorTick::Inactive);
        assert_eq!(h.notifier.count(AlertKind::Emergency), 2);
    }

    #[tokio::test]
    async fn test_tick_for_completed_check_in_is_inactive() {
        let h = harness();
        let check_in = h.manager.schedule_check_in(meetup(h.clock.now())).await.unwrap();
        h.manager.start_check_in(&check_in.id).await.unwrap();
        h.manager.complete_check_in(&check_in.id).await.unwrap();

        h.clock.set(check_in.check_in_time + ChronoDuration::hours(1));
        assert_eq!(h.manager.check_overdue(&check_in.id).await, MonitorTick::Inactive);
        assert_eq!(h.notifier.count(AlertKind::Emergency), 0);
    }

    #[tokio::test]
    async fn test_reload_and_resume_monitoring() {
        let store = Arc::new(MemoryStore::new());
        let start = Utc::now();
        let (active_id, scheduled_id) = {
            let h = harness_with_store(store.clone(), start);
            let a = h.manager.schedule_check_in(meetup(start)).await.unwrap();
            let b = h.manager.schedule_check_in(meetup(start)).await.unwrap();
            h.manager.start_check_in(&a.id).await.unwrap();
            h.manager.cleanup();
            assert_eq!(h.manager.monitored_count(), 0);
            (a.id, b.id)
        };

        let h = harness_with_store(store, start);
        assert!(h.manager.has_active_check_in().await);
        assert_eq!(h.manager.get(&scheduled_id).await.unwrap().status, CheckInStatus::Scheduled);
        assert!(!h.manager.is_monitoring(&active_id));

        h.manager.start().await;
        assert!(h.manager.is_monitoring(&active_id));
        h.manager.cleanup();
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.save(StorageKeys::SESSION_CHECK_INS, b"[1,2").unwrap();

        let result = SessionCheckInManager::new(
            CheckInConfig::default(),
            CheckInPorts::new(
                store,
                Arc::new(RecordingReminders::default()),
                Arc::new(RecordingNotifier::default()),
            ),
        );

        assert!(matches!(result, Err(CheckInError::Json(_))));
    }

    #[test]
    fn test_zero_monitor_interval_is_rejected() {
        let result = SessionCheckInManager::new(
            CheckInConfig {
                monitor_interval: std::time::Duration::ZERO,
                ..Default::default()
            },
            CheckInPorts::new(
                Arc::new(MemoryStore::new()),
                Arc::new(RecordingReminders::default()),
                Arc::new(RecordingNotifier::default()),
            ),
        );

        assert!(matches!(result, Err(CheckInError::InvalidConfig(_))));
    }
}
