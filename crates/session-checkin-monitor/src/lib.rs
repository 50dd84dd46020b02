//! Safety check-ins for real-world squad meetups.
//!
//! A member schedules a check-in before meeting up, starts it when the
//! meetup begins, and completes it once safe. While active, a per-check-in
//! timer watches the deadline: contacts are warned once it passes and an
//! emergency is raised when the grace period runs out.
//!
//! ```text
//! scheduled --start--> active --complete--> completed
//! scheduled --cancel--> cancelled
//! active    --cancel--> cancelled
//! active    --deadline + grace | trigger_emergency--> emergency
//! ```

mod error;
mod manager;
mod model;
mod monitor;
mod notifier;

pub use error::{CheckInError, CheckInResult};
pub use manager::{CheckInConfig, CheckInPorts, SessionCheckInManager};
pub use model::{CheckInStatus, ContactChannel, EmergencyContact, NewCheckIn, SessionCheckIn};
pub use monitor::{
    evaluate_deadline, DeadlineState, MonitorTick, DEFAULT_GRACE_PERIOD, DEFAULT_MONITOR_INTERVAL,
};
pub use notifier::{
    AlertKind, ContactAlert, EmergencyNotifier, ReminderScheduler, TracingEmergencyNotifier,
    TracingReminderScheduler,
};
