//! Device-level signals consumed by the Squadlink managers.
//!
//! Both managers read these through traits so tests can drive them:
//! - [`ConnectivitySignal`]: "online now?" plus a restore notification
//! - [`Clock`]: wall-clock time for timestamps and deadlines
//! - [`AnalyticsSink`]: fire-and-forget product events

mod analytics;
mod clock;
mod connectivity;

pub use analytics::{AnalyticsSink, NoopAnalytics, TracingAnalytics};
pub use clock::{Clock, ManualClock, SystemClock};
pub use connectivity::{ConnectivityMonitor, ConnectivitySignal};
