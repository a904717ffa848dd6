//! Daemon configuration parsing.
//!
//! The config file (TOML) defines the event-source directories, the polling
//! cadence, the global crash-notification setting, and the static package
//! table backing the fallback identity resolution path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use faultline_core::classify::PER_USER_RANGE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but violates a schema constraint.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FaultlineConfig {
    /// Daemon runtime settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Static package table.
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

impl FaultlineConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a package entry declares
    /// an app id outside the per-user band.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for package in &self.packages {
            if package.app_id >= PER_USER_RANGE {
                return Err(ConfigError::Validation(format!(
                    "package {} declares app id {} outside the per-user band; \
                     app ids are user-relative",
                    package.name, package.app_id
                )));
            }
        }
        Ok(())
    }
}

/// Daemon runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory watched for newly written tombstone files (live events).
    #[serde(default = "default_tombstone_dir")]
    pub tombstone_dir: PathBuf,

    /// Directory of spooled queue entries replayed at startup (historical
    /// events). Absent means no replay.
    #[serde(default)]
    pub queue_dir: Option<PathBuf>,

    /// Cadence of the tombstone directory scan.
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Whether crashes of trusted system processes raise notifications.
    #[serde(default)]
    pub show_system_crash_notifications: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tombstone_dir: default_tombstone_dir(),
            queue_dir: None,
            poll_interval: default_poll_interval(),
            show_system_crash_notifications: false,
        }
    }
}

fn default_tombstone_dir() -> PathBuf {
    PathBuf::from("/var/lib/faultline/tombstones")
}

const fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

/// One package in the static table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageEntry {
    /// Package name.
    pub name: String,

    /// Per-user app id the package runs under.
    pub app_id: u32,

    /// Whether this is a trusted (system-tier) package.
    #[serde(default)]
    pub system: bool,

    /// Whether the package suppresses memory-tagging advisories.
    #[serde(default)]
    pub suppress_memtag_advisory: bool,
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
