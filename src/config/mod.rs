//! Configuration management.
//!
//! Settings come from a TOML file plus `BOOKSWAP_*` environment overrides
//! (nested keys use `__`, e.g. `BOOKSWAP_FIREBASE__PROJECT_ID`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [firebase]
//! project_id = "studentbookplatform"
//! api_key = "your-web-api-key"
//! database = "(default)"
//!
//! [search]
//! page_size = 10
//! recent_limit = 8
//!
//! [http]
//! timeout_seconds = 30
//! connect_timeout_seconds = 10
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory and the config directory
pub const CONFIG_FILE_NAME: &str = "bookswap.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend settings
    #[serde(default)]
    pub firebase: FirebaseConfig,

    /// Search pipeline settings
    #[serde(default)]
    pub search: SearchConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Firebase project settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Project id (required for the Firestore and auth backends)
    #[serde(default)]
    pub project_id: Option<String>,

    /// Web API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Firestore database id
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: std::env::var("FIREBASE_PROJECT_ID").ok(),
            api_key: std::env::var("FIREBASE_API_KEY").ok(),
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    "(default)".to_string()
}

/// Search pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Listings shown by the recent view
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

fn default_recent_limit() -> usize {
    8
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Write the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("BOOKSWAP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Load configuration from environment overrides and defaults only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(
            config::Environment::with_prefix("BOOKSWAP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Default location of the user config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bookswap").join("config.toml"))
}

/// Find a config file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}
