//! Configuration types for rclone-worker
//!
//! The worker never reads global preferences; everything it needs is carried
//! by a [`WorkerConfig`] handed to [`crate::EphemeralWorker::new`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Diagnostic logging settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Persist raw error-level status lines (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// File the raw lines are appended to; logging is inert without it
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// How the rclone engine is located and invoked
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RcloneConfig {
    /// Path to the rclone executable (auto-detected if None)
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Whether to search PATH for rclone if `binary_path` is not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Interval between engine stats lines (default: 1 second)
    #[serde(default = "default_stats_interval", with = "duration_serde")]
    pub stats_interval: Duration,

    /// Extra flags appended to every engine command line
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

impl Default for RcloneConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_path: true,
            stats_interval: default_stats_interval(),
            extra_flags: Vec::new(),
        }
    }
}

impl RcloneConfig {
    /// Resolve the engine binary
    ///
    /// An explicit `binary_path` always wins. Otherwise PATH is searched with
    /// the `which` crate when `search_path` is enabled.
    pub fn resolve_binary(&self) -> Result<PathBuf> {
        if let Some(path) = &self.binary_path {
            return Ok(path.clone());
        }
        if self.search_path
            && let Ok(path) = which::which("rclone")
        {
            return Ok(path);
        }
        Err(Error::Config {
            message: "rclone binary not configured and not found in PATH".into(),
            key: Some("rclone.binary_path".into()),
        })
    }
}

/// Network precondition policy
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    /// Refuse to run on metered connections (default: true)
    #[serde(default = "default_true")]
    pub require_unmetered: bool,

    /// Evaluate the gate before the engine is launched (default: false)
    ///
    /// When false the engine is started first and discarded if the gate
    /// fails, which matches the behaviour existing hosts depend on.
    #[serde(default)]
    pub check_before_launch: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            require_unmetered: true,
            check_before_launch: false,
        }
    }
}

/// Main configuration for [`crate::EphemeralWorker`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Diagnostic logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Engine location and flags
    #[serde(default)]
    pub rclone: RcloneConfig,

    /// Network preconditions
    #[serde(default)]
    pub gate: GateConfig,

    /// Report a non-zero engine exit as `RcloneError` (default: true)
    #[serde(default = "default_true")]
    pub fail_on_engine_exit_code: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            rclone: RcloneConfig::default(),
            gate: GateConfig::default(),
            fail_on_engine_exit_code: true,
        }
    }
}

impl WorkerConfig {
    /// Parse a configuration from JSON, filling omitted fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rclone.stats_interval.is_zero() {
            return Err(Error::Config {
                message: "stats interval must be at least one second".into(),
                key: Some("rclone.stats_interval".into()),
            });
        }
        if self.logging.enabled && self.logging.log_file.is_none() {
            tracing::warn!("logging enabled without a log_file; raw status lines will not be kept");
        }
        Ok(())
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_stats_interval() -> Duration {
    Duration::from_secs(1)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
