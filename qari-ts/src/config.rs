//! Configuration for the transcription and scoring service.
//!
//! Bootstrap settings come from a TOML file, with overrides applied on top:
//! 1. Command-line arguments
//! 2. Environment variables (via clap `env` attributes)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! The database and stored recitation audio both live under the root
//! folder, so a single path override relocates everything.

use qari_common::config::resolve_root_folder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Bootstrap configuration loaded from TOML
///
/// These settings cannot change during runtime. The service must restart
/// to pick up changes to the TOML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root folder for the database and stored recitation audio
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Speech recognition service settings
    #[serde(default)]
    pub asr: AsrConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Speech recognition client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AsrConfig {
    /// Transcription endpoint URL
    #[serde(default = "default_asr_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_asr_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_port() -> u16 {
    4810
}

fn default_asr_endpoint() -> String {
    "http://127.0.0.1:9001/transcribe".to_string()
}

fn default_asr_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root_folder: None,
            asr: AsrConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            endpoint: default_asr_endpoint(),
            timeout_secs: default_asr_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub root_folder: Option<PathBuf>,
    pub asr_endpoint: Option<String>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP server port
    pub port: u16,
    /// Root folder holding the database and stored audio
    pub root_folder: PathBuf,
    /// SQLite database file path (inside the root folder)
    pub database_path: PathBuf,
    /// Transcription endpoint URL
    pub asr_endpoint: String,
    /// Transcription request timeout
    pub asr_timeout: Duration,
    /// Log level
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge TOML settings with command-line overrides.
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Self {
        let root_folder = resolve_root_folder(
            overrides.root_folder.as_deref(),
            "QARI_ROOT_FOLDER",
            toml.root_folder.as_deref(),
        );
        let database_path = root_folder.join("qari.db");

        Self {
            port: overrides.port.unwrap_or(toml.port),
            root_folder,
            database_path,
            asr_endpoint: overrides.asr_endpoint.unwrap_or(toml.asr.endpoint),
            asr_timeout: Duration::from_secs(toml.asr.timeout_secs),
            log_level: toml.logging.level,
        }
    }
}
