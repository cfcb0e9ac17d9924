//! Configuration for the capture client.
//!
//! Bootstrap settings come from a TOML file, with overrides applied on top:
//! 1. Command-line arguments
//! 2. Environment variables (via clap `env` attributes)
//! 3. TOML configuration file
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::upload::RetryPolicy;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Base URL of the transcription service
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Preferred input device name (omit for the system default)
    #[serde(default)]
    pub input_device: Option<String>,

    /// Upload retry settings
    #[serde(default)]
    pub upload: UploadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upload retry settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Total attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_service_url() -> String {
    "http://127.0.0.1:4810".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            input_device: None,
            upload: UploadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
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
    pub service_url: Option<String>,
    pub input_device: Option<String>,
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the transcription service
    pub service_url: String,
    /// Preferred input device name
    pub input_device: Option<String>,
    /// Upload retry policy
    pub retry: RetryPolicy,
    /// Log level
    pub log_level: String,
}

impl ClientConfig {
    /// Merge TOML settings with command-line overrides.
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Self {
        Self {
            service_url: overrides.service_url.unwrap_or(toml.service_url),
            input_device: overrides.input_device.or(toml.input_device),
            retry: RetryPolicy {
                max_attempts: toml.upload.max_attempts,
                delay: Duration::from_secs(toml.upload.retry_delay_secs),
            },
            log_level: toml.logging.level,
        }
    }
}
