//! Configuration, file-system paths, and logging setup shared by the Squadlink crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    CheckInSettings, Config, ConnectivitySettings, QueueSettings, DEFAULT_API_URL,
    DEFAULT_LOG_LEVEL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
