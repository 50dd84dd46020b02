//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default message API URL (can be overridden at compile time via SQUADLINK_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("SQUADLINK_API_URL") {
    Some(url) => url,
    None => "https://api.squadlink.app",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Offline message queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Seconds between periodic flush attempts while the queue is non-empty.
    pub flush_interval_secs: u64,
    /// Recorded failures after which a message stops being retried automatically.
    pub max_send_attempts: u32,
    /// HTTP request timeout for a single send.
    pub request_timeout_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            flush_interval_secs: 30,
            max_send_attempts: 3,
            request_timeout_secs: 30,
        }
    }
}

impl QueueSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Safety check-in monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckInSettings {
    /// Seconds between overdue checks for each active check-in.
    pub monitor_interval_secs: u64,
    /// Seconds past the check-in deadline before contacts are alerted.
    pub grace_period_secs: u64,
}

impl Default for CheckInSettings {
    fn default() -> Self {
        Self {
            monitor_interval_secs: 60,
            grace_period_secs: 15 * 60,
        }
    }
}

impl CheckInSettings {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// Connectivity probe settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivitySettings {
    pub probe_interval_secs: u64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            probe_interval_secs: 15,
        }
    }
}

impl ConnectivitySettings {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Base URL of the message API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token for the message API. Environment only, never written to disk.
    #[serde(skip)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub check_in: CheckInSettings,
    #[serde(default)]
    pub connectivity: ConnectivitySettings,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            queue: QueueSettings::default(),
            check_in: CheckInSettings::default(),
            connectivity: ConnectivitySettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("SQUADLINK_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(api_url) = std::env::var("SQUADLINK_API_URL") {
            self.api_url = api_url;
        }
        if let Ok(token) = std::env::var("SQUADLINK_API_TOKEN") {
            let token = token.trim();
            if !token.is_empty() {
                self.api_token = Some(token.to_string());
            }
        }
    }

    /// Reject settings the services cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;
        if self.queue.flush_interval_secs == 0 {
            return Err(CoreError::Config(
                "queue.flush_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.queue.max_send_attempts == 0 {
            return Err(CoreError::Config(
                "queue.max_send_attempts must be at least 1".to_string(),
            ));
        }
        if self.check_in.monitor_interval_secs == 0 {
            return Err(CoreError::Config(
                "check_in.monitor_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.connectivity.probe_interval_secs == 0 {
            return Err(CoreError::Config(
                "connectivity.probe_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the API URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }
}
