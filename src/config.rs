//! Configuration file support.
//!
//! Review settings are stored as versioned JSON so a deployment can tune the
//! auto-confirm window and logging without rebuilding.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// What happens when a countdown runs out while someone is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryPolicy {
    /// Auto-confirm immediately; the open edit session is closed and its draft dropped
    #[default]
    Preempt,
    /// Let the editor finish; auto-confirm only if they cancel
    Defer,
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Default auto-confirm window in seconds.
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 120;

/// Default number of lifecycle events kept in history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Review settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Seconds before an AI classification is auto-confirmed
    #[serde(default = "default_countdown_seconds")]
    pub countdown_seconds: u32,

    /// Behaviour when the countdown expires mid-edit
    #[serde(default)]
    pub expiry_policy: ExpiryPolicy,

    /// Number of lifecycle events kept in history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_countdown_seconds() -> u32 {
    DEFAULT_COUNTDOWN_SECONDS
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl ReviewConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            countdown_seconds: default_countdown_seconds(),
            expiry_policy: ExpiryPolicy::default(),
            history_limit: default_history_limit(),
            log_level: LogLevel::default(),
        }
    }

    /// Set the auto-confirm window.
    pub fn with_countdown_seconds(mut self, seconds: u32) -> Self {
        self.countdown_seconds = seconds;
        self
    }

    /// Set the mid-edit expiry policy.
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }

    /// Set the history size.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        if config.countdown_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "countdown_seconds",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(config)
    }

    /// File name used inside the config directory.
    pub fn default_filename() -> &'static str {
        "hazard-review.json"
    }

    /// `<config dir>/hazard-review/hazard-review.json`, with `~/.config` as
    /// the config dir on platforms `dirs` knows nothing about.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|dir| dir.join("hazard-review").join(Self::default_filename()))
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        log::info!(
            "Loaded config from {:?} (countdown {}s, {:?})",
            path,
            config.countdown_seconds,
            config.expiry_policy
        );
        Ok(config)
    }

    /// Write this config as JSON, creating missing directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, self.to_json()?)?;
        log::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Load the config at `path`. A missing file is created with the defaults
    /// so deployments have a template to edit.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::new();
        config.save(path)?;
        Ok(config)
    }

    /// [`Self::load_or_init`] at [`Self::default_path`].
    pub fn load_or_init_default() -> Result<Self, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_or_init(&path)
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A setting has an unusable value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    /// No platform config or home directory
    #[error("No config directory available")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("Config file I/O failed: {0}")]
    IoError(#[from] std::io::Error),
}
