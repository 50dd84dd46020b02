//! Notification ports.
//!
//! Both ports are fire-and-forget: they return nothing and the state machine
//! never waits on or reacts to delivery.

use crate::{EmergencyContact, SessionCheckIn};
use tracing::{debug, info, warn};

/// Why a contact is being alerted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    MonitoringStarted,
    CompletedSafely,
    Overdue,
    Emergency,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonitoringStarted => "monitoring_started",
            Self::CompletedSafely => "completed_safely",
            Self::Overdue => "overdue",
            Self::Emergency => "emergency",
        }
    }
}

/// A message for one emergency contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactAlert {
    pub kind: AlertKind,
    pub check_in_id: String,
    pub text: String,
}

impl ContactAlert {
    pub(crate) fn for_check_in(kind: AlertKind, check_in: &SessionCheckIn) -> Self {
        let due = check_in.check_in_time.format("%Y-%m-%d %H:%M UTC");
        let name = &check_in.squad_member_name;
        let location = &check_in.location;
        let text = match kind {
            AlertKind::MonitoringStarted => format!(
                "{name} is meeting their squad at {location}. You will be alerted if they do not check in by {due}."
            ),
            AlertKind::CompletedSafely => {
                format!("{name} checked in safely from {location}.")
            }
            AlertKind::Overdue => format!(
                "{name} has not checked in from {location}. The check-in was due at {due}."
            ),
            AlertKind::Emergency => format!(
                "EMERGENCY: {name} missed their safety check-in at {location} (due {due}). Please try to reach them."
            ),
        };
        Self {
            kind,
            check_in_id: check_in.id.clone(),
            text,
        }
    }
}

/// Local reminders for the member who scheduled the check-in.
pub trait ReminderScheduler: Send + Sync {
    fn schedule_reminder(&self, check_in: &SessionCheckIn);

    /// Drop any pending reminders for a check-in.
    fn cancel_reminders(&self, _check_in_id: &str) {}
}

/// Delivery to a single emergency contact.
pub trait EmergencyNotifier: Send + Sync {
    fn notify(&self, contact: &EmergencyContact, alert: &ContactAlert);
}

/// Logs reminders instead of scheduling device notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReminderScheduler;

impl ReminderScheduler for TracingReminderScheduler {
    fn schedule_reminder(&self, check_in: &SessionCheckIn) {
        info!(
            check_in_id = %check_in.id,
            scheduled_time = %check_in.scheduled_time,
            check_in_time = %check_in.check_in_time,
            "Reminder scheduled"
        );
    }

    fn cancel_reminders(&self, check_in_id: &str) {
        debug!(check_in_id = %check_in_id, "Reminders cancelled");
    }
}

/// Logs contact alerts instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmergencyNotifier;

impl EmergencyNotifier for TracingEmergencyNotifier {
    fn notify(&self, contact: &EmergencyContact, alert: &ContactAlert) {
        match alert.kind {
            AlertKind::Emergency | AlertKind::Overdue => warn!(
                contact = %contact.name,
                check_in_id = %alert.check_in_id,
                kind = alert.kind.as_str(),
                text = %alert.text,
                "Contact alert"
            ),
            _ => info!(
                contact = %contact.name,
                check_in_id = %alert.check_in_id,
                kind = alert.kind.as_str(),
                "Contact alert"
            ),
        }
    }
}
