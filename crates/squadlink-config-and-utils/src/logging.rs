//! Logging initialization.
//!
//! Thin wrapper over the observability crate so binaries only need the
//! level and the resolved paths.

use crate::Paths;
use observability::LogConfig;

/// Initialize the logging system.
///
/// Structured JSONL goes to `paths.log_file()`; `also_stderr` mirrors it in
/// compact form for foreground runs. `RUST_LOG` overrides `level`.
///
/// ```ignore
/// init_logging("squadlink", "info", &paths, true);
/// tracing::info!("service started");
/// ```
pub fn init_logging(service_name: &str, level: &str, paths: &Paths, also_stderr: bool) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_all_variants() {
        assert_eq!(parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(parse_level("debug"), tracing::Level::DEBUG);
        assert_eq!(parse_level("info"), tracing::Level::INFO);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("warning"), tracing::Level::WARN);
        assert_eq!(parse_level("error"), tracing::Level::ERROR);
    }

    #[test]
    fn parse_level_case_insensitive() {
        assert_eq!(parse_level("Debug"), tracing::Level::DEBUG);
        assert_eq!(parse_level("WARNING"), tracing::Level::WARN);
    }

    #[test]
    fn parse_level_unknown_defaults_to_info() {
        assert_eq!(parse_level(""), tracing::Level::INFO);
        assert_eq!(parse_level("verbose"), tracing::Level::INFO);
    }

    #[test]
    fn level_renders_as_filter_directive() {
        assert_eq!(parse_level("WARNING").to_string().to_lowercase(), "warn");
    }
}
