// src/config.rs

use crate::{
    constants::{CONFIG_FILENAME, DEFAULT_CLI_COMMAND},
    models::LogLevel,
};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use thiserror::Error;

lazy_static! {
    static ref TIBUILD_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to expand path '{value}': {message}")]
    Expansion { value: String, message: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: LogLevel,
    /// Send build commands to an interactive terminal instead of capturing their output.
    pub use_terminal_for_build: bool,
    /// CLI used for every command; may carry leading arguments (`npx appc`).
    pub cli_command: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Trace,
            use_terminal_for_build: false,
            cli_command: DEFAULT_CLI_COMMAND.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PackageConfig {
    pub distribution_output_directory: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            distribution_output_directory: "dist".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub package: PackageConfig,
}

impl Config {
    /// Loads the global configuration, writing the defaults on first use.
    pub fn load() -> Result<Self, ConfigError> {
        let path = get_config_dir()?.join(CONFIG_FILENAME);
        if !path.exists() {
            let config = Self::default();
            fs::write(&path, toml::to_string_pretty(&config)?)?;
            log::debug!("Wrote default configuration to '{}'", path.display());
            return Ok(config);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Absolute directory that package runs write to. `~` and environment variables
    /// are expanded; a relative value is taken from `workspace_folder`.
    pub fn distribution_output_directory(
        &self,
        workspace_folder: &Path,
    ) -> Result<PathBuf, ConfigError> {
        let value = &self.package.distribution_output_directory;
        let expanded = shellexpand::full(value).map_err(|e| ConfigError::Expansion {
            value: value.clone(),
            message: e.to_string(),
        })?;
        let path = PathBuf::from(expanded.into_owned());
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(workspace_folder.join(path))
        }
    }
}

/// Returns the path to the tibuild configuration directory (`~/.config/tibuild`),
/// creating it if needed. Memoized after the first call.
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    let mut cached = TIBUILD_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("tibuild");
    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| ConfigError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    *cached = Some(config_path.clone());
    Ok(config_path)
}
