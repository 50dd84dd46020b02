//! # Observability
//!
//! Centralized logging layer for the Squadlink services.
//!
//! Services are **log producers**: they call [`init_with_config`] once at
//! startup and then use plain `tracing` macros. Where the lines end up is
//! decided here, not at the call sites.
//!
//! Every service appends structured JSONL to a single file
//! (`~/.squadlink/logs/squadlink.jsonl` unless configured otherwise), which can
//! be followed with `tail -f ... | jq`. A compact human-readable copy can also
//! go to stderr for foreground runs.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "squadlink".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file_sink;
mod json_layer;

pub use file_sink::{CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "squadlink", "cli").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.squadlink/logs/squadlink.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Central log file location shared by all services.
fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".squadlink")
            .join("logs")
            .join("squadlink.jsonl")
    })
}

/// Initialize the observability layer with default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the observability layer with custom configuration.
///
/// Falls back to stderr-only output when the log file cannot be opened.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_config(config: LogConfig) {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let log_path = config.log_path.clone().or_else(default_log_path);
    let writer = match &log_path {
        Some(path) => match CentralLogWriter::new(path) {
            Ok(writer) => Some(writer),
            Err(e) => {
                eprintln!("failed to open log file {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    let json_layer = writer.map(|writer| {
        JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer))
            .with_filter(env_filter())
    });

    // Without a file there is nowhere else to write, so stderr is forced on.
    let stderr_layer = if config.also_stderr || json_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(io::stderr)
                .with_ansi(true)
                .with_filter(env_filter()),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service_name,
            log_path = ?log_path.as_ref().map(|p| p.display().to_string()),
            "observability initialized"
        );
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
