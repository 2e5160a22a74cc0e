//! Configuration loading and data directory resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TOML configuration file contents (`~/.config/glycoguide/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding the image index, lock registry, and audit artifacts
    pub data_dir: Option<String>,
    /// SQLite database path (overrides `<data_dir>/glycoguide.db`)
    pub database_path: Option<String>,
    /// Directory of generated image assets (for index building)
    pub image_dir: Option<String>,
}

/// Data directory resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&PathBuf>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.clone();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config) = load_config_file() {
        if let Some(data_dir) = config.data_dir {
            return PathBuf::from(data_dir);
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// Load the TOML config file from the platform config directory
pub fn load_config_file() -> Result<TomlConfig> {
    let config_path = config_file_path()?;
    if !config_path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            config_path.display()
        )));
    }

    let content = std::fs::read_to_string(&config_path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}

/// Get the configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("glycoguide").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Get OS-dependent default data directory path
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("glycoguide"))
        .unwrap_or_else(|| PathBuf::from("./glycoguide_data"))
}
