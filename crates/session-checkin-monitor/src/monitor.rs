//! Deadline evaluation for active check-ins.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default period between monitoring ticks.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Default time past the deadline before escalating to an emergency.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Where `now` sits relative to a check-in deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineState {
    /// Deadline not yet passed.
    OnTime,
    /// Deadline passed, still within the grace period.
    Overdue,
    /// More than the grace period past the deadline.
    PastGrace,
}

pub fn evaluate_deadline(
    check_in_time: DateTime<Utc>,
    now: DateTime<Utc>,
    grace_period: Duration,
) -> DeadlineState {
    if now <= check_in_time {
        return DeadlineState::OnTime;
    }
    match (now - check_in_time).to_std() {
        Ok(elapsed) if elapsed > grace_period => DeadlineState::PastGrace,
        _ => DeadlineState::Overdue,
    }
}

/// What a single monitoring tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorTick {
    /// The check-in is gone or no longer `active`; monitoring should stop.
    Inactive,
    /// Deadline not reached.
    OnTime,
    /// Deadline passed; contacts have been warned (once).
    Overdue,
    /// Grace period exhausted; the check-in is now an emergency.
    Escalated,
}
