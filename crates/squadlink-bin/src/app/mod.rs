//! Application wiring and lifecycle management.

mod commands;
mod connectivity_probe;
mod init;
mod state;

pub use commands::{list_check_ins, queue_clear, queue_status};
pub use init::run_service;
pub use state::ServiceState;
