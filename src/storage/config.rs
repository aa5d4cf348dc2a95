//! Application configuration persistence.
//!
//! Plan documents carry their own configuration; these are the
//! machine-local settings that survive across plans.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Remote service settings
    pub remote: RemoteSettings,
    /// Planning defaults
    pub planning: PlanningSettings,
    /// Recently used paths
    pub paths: PathSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            remote: RemoteSettings::default(),
            planning: PlanningSettings::default(),
            paths: PathSettings::default(),
        }
    }
}

/// Remote service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Service base URL
    pub base_url: String,
    /// Folder holding the OAuth session material
    pub oauth_folder: PathBuf,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: "https://connectapi.garmin.com".to_string(),
            oauth_folder: PathBuf::from("~/.garth"),
        }
    }
}

/// Defaults applied to newly created plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSettings {
    /// Preferred weekday indices, 0 = Monday
    pub preferred_days: Vec<u32>,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            preferred_days: vec![1, 3, 5],
        }
    }
}

/// Recently used import/export locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathSettings {
    pub last_import_dir: Option<PathBuf>,
    pub last_export_dir: Option<PathBuf>,
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "trainplan", "Trainplan")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load application configuration from a specific file.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        let config = AppConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        };
        return Ok(config);
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = get_data_dir();

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save application configuration to a specific file.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    tracing::debug!("Configuration saved to {}", path.display());
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.planning.preferred_days, vec![1, 3, 5]);
        assert!(config.remote.base_url.starts_with("https://"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.planning.preferred_days = vec![0, 2, 4];
        config.paths.last_import_dir = Some(PathBuf::from("/tmp/plans"));

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.planning.preferred_days, vec![0, 2, 4]);
        assert_eq!(
            loaded.paths.last_import_dir,
            Some(PathBuf::from("/tmp/plans"))
        );
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded.planning.preferred_days, vec![1, 3, 5]);
    }
}
