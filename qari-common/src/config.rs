//! Configuration loading and root folder resolution
//!
//! Each binary keeps a small TOML bootstrap config; runtime behavior beyond
//! bootstrap is driven by CLI/env overrides. Priority everywhere:
//! command line > environment variable > TOML file > compiled default.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default config file location for a binary: `~/.config/qari/<name>.toml`,
/// falling back to the working directory when no config dir is known.
pub fn default_config_path(binary_name: &str) -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("qari").join(format!("{}.toml", binary_name)))
        .unwrap_or_else(|| PathBuf::from(format!("{}.toml", binary_name)))
}

/// OS-dependent default root folder (database + stored artifacts)
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("qari"))
        .unwrap_or_else(|| PathBuf::from("./qari_data"))
}

/// Resolve the root folder with priority:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config value
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// Load a TOML config file into a typed struct
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file {:?}: {}", path, e)))
}

/// Write a TOML config file atomically (temp file + rename), so a crash
/// mid-write never leaves a truncated config behind.
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Load a config file, creating it with defaults on first run.
///
/// A missing file is not an error: defaults are written back so the user
/// has something to edit. An unparseable file is an error, not silently
/// replaced.
pub fn load_or_create_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    if path.exists() {
        let config = load_toml_config(path)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    } else {
        let defaults = T::default();
        if let Err(e) = write_toml_config(&defaults, path) {
            warn!("Could not write default config to {:?}: {}", path, e);
        } else {
            info!("Created default configuration at {:?}", path);
        }
        Ok(defaults)
    }
}
