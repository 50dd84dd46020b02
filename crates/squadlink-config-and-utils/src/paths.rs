//! File system paths.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the home directory.
const BASE_DIR_NAME: &str = ".squadlink";
/// JSONL log filename under the logs directory.
const LOG_FILE_NAME: &str = "squadlink.jsonl";

/// Resolves every on-disk location used by the services.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.squadlink)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.squadlink`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.squadlink).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.squadlink/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the durable store directory (~/.squadlink/store).
    ///
    /// Holds one file per persisted blob (message queue, check-ins).
    pub fn store_dir(&self) -> PathBuf {
        self.base_dir.join("store")
    }

    /// Get the PID file path (~/.squadlink/squadlink.pid).
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join("squadlink.pid")
    }

    /// Get the logs directory (~/.squadlink/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file path (~/.squadlink/logs/squadlink.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.store_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
