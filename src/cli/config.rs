//! Queuekeeper configuration file handling
//!
//! Provides default configuration generation and loading for the bot.
//! Configuration files are TOML and live under the platform data directory
//! unless `--config` points elsewhere. The directory files default to
//! siblings of the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use queuekeeper::moderation::image::{DEFAULT_BRIGHTNESS_THRESHOLD, DEFAULT_RED_THRESHOLD};
use queuekeeper::moderation::ImageThresholds;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid duration for {field} '{value}': {message}")]
    Duration {
        field: &'static str,
        value: String,
        message: String,
    },
}

/// Queuekeeper operator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueuekeeperConfig {
    #[serde(default)]
    pub bot: BotSection,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Public identity of the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSection {
    /// Base of the deep link encoded in QR codes
    #[serde(default = "default_deep_link_base")]
    pub deep_link_base: String,

    /// Business name shown in greetings and help
    #[serde(default = "default_business_name")]
    pub business_name: String,
}

/// Where the directory lists are persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Admin list file (default: `admins.json` next to the config)
    pub admins_file: Option<PathBuf>,

    /// Group list file (default: `groups.json` next to the config)
    pub groups_file: Option<PathBuf>,
}

/// Seeds used when a directory file is missing or corrupt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Bootstrap admins (empty means the compiled default)
    #[serde(default)]
    pub seed_admins: Vec<i64>,

    /// Bootstrap broadcast groups
    #[serde(default)]
    pub seed_groups: Vec<i64>,
}

/// Ticket retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How long a ticket lives, e.g. "7days"
    #[serde(default = "default_retention")]
    pub retention: String,

    /// How often the eviction sweep runs, e.g. "24h"
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
}

/// Content moderation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extra denylisted terms on top of the built-in vocabulary
    #[serde(default)]
    pub extra_terms: Vec<String>,

    /// Mean red channel (0-255) above which an image is flagged
    #[serde(default = "default_red_threshold")]
    pub red_threshold: f64,

    /// Mean brightness (0-255) above which an image is flagged
    #[serde(default = "default_brightness_threshold")]
    pub brightness_threshold: f64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_deep_link_base() -> String {
    "https://t.me/speedwash_bot".to_string()
}

fn default_business_name() -> String {
    "Speed Car Wash".to_string()
}

fn default_retention() -> String {
    "7days".to_string()
}

fn default_sweep_interval() -> String {
    "24h".to_string()
}

fn default_true() -> bool {
    true
}

fn default_red_threshold() -> f64 {
    DEFAULT_RED_THRESHOLD
}

fn default_brightness_threshold() -> f64 {
    DEFAULT_BRIGHTNESS_THRESHOLD
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            deep_link_base: default_deep_link_base(),
            business_name: default_business_name(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_terms: Vec::new(),
            red_threshold: DEFAULT_RED_THRESHOLD,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
        }
    }
}

impl ModerationConfig {
    pub fn thresholds(&self) -> ImageThresholds {
        ImageThresholds {
            red: self.red_threshold,
            brightness: self.brightness_threshold,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl QueueConfig {
    pub fn retention(&self) -> Result<Duration, ConfigError> {
        parse_duration("queue.retention", &self.retention)
    }

    pub fn sweep_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration("queue.sweep_interval", &self.sweep_interval)
    }
}

/// Parse a human-readable duration ("7days", "24h", "90 min").
fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Duration {
        field,
        value: value.to_string(),
        message: e.to_string(),
    })
}

impl QueuekeeperConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        write_file(path, &contents)
    }

    /// Admin list location, resolved against the config file's directory.
    pub fn admins_file(&self, config_path: &Path) -> PathBuf {
        self.storage
            .admins_file
            .clone()
            .unwrap_or_else(|| config_dir(config_path).join("admins.json"))
    }

    /// Group list location, resolved against the config file's directory.
    pub fn groups_file(&self, config_path: &Path) -> PathBuf {
        self.storage
            .groups_file
            .clone()
            .unwrap_or_else(|| config_dir(config_path).join("groups.json"))
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        format!(
            r#"# Queuekeeper Bot Configuration
#
# Walk-in service queue bot: customers register, wait and are notified
# when their vehicle is ready. Admins and notification groups are managed
# from chat with /addadmin, /addgroups and friends; the seeds below are
# only used when the list files are missing or unreadable.

[bot]
# Base of the deep link encoded in the QR code handed to customers
deep_link_base = "{deep_link_base}"

# Business name shown in greetings and help
business_name = "{business_name}"

[storage]
# Directory list files (default: next to this config file)
# admins_file = "/var/lib/queuekeeper/admins.json"
# groups_file = "/var/lib/queuekeeper/groups.json"

[directory]
# Bootstrap admin user ids. Leave empty to use the compiled default.
seed_admins = []

# Bootstrap notification group ids
seed_groups = []

[queue]
# Tickets older than this are purged whatever their status
retention = "{retention}"

# How often the purge runs
sweep_interval = "{sweep_interval}"

[moderation]
enabled = true

# Extra denylisted terms (case-insensitive substring match)
extra_terms = []

# Image heuristic: mean red channel / overall brightness, 0-255
red_threshold = {red:.1}
brightness_threshold = {brightness:.1}

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/queuekeeper/queuekeeper.log"
"#,
            deep_link_base = default_deep_link_base(),
            business_name = default_business_name(),
            retention = default_retention(),
            sweep_interval = default_sweep_interval(),
            red = DEFAULT_RED_THRESHOLD,
            brightness = DEFAULT_BRIGHTNESS_THRESHOLD,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), ConfigError> {
        write_file(config_path, &Self::generate_default_toml())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default config file path: `<data_dir>/queuekeeper/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("queuekeeper")
        .join("config.toml")
}
