// src/core/config.rs

use crate::{
    constants::{CONFIG_DIR_NAME, CONFIG_FILENAME, CONFIG_PATH_ENV, DEFAULT_STATUS_INTERVAL_MS},
    models::RosDevConfig,
    system::platform::ShellPlatform,
};
use lazy_static::lazy_static;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

lazy_static! {
    static ref CONFIG_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to expand install root '{template}': {message}")]
    Expand { template: String, message: String },
}

/// Returns the configuration file path: `$ROSDEV_CONFIG` if set, otherwise
/// `<config_dir>/rosdev/config.toml`.
///
/// Memoized: the first call computes the path, later calls reuse it.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let mut cached = CONFIG_PATH.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let path = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILENAME),
    };

    *cached = Some(path.clone());
    Ok(path)
}

/// Loads the user configuration, writing a default file on first use.
pub fn load() -> Result<RosDevConfig, ConfigError> {
    load_from(&config_path()?)
}

pub fn save(config: &RosDevConfig) -> Result<(), ConfigError> {
    save_to(&config_path()?, config)
}

pub fn load_from(path: &Path) -> Result<RosDevConfig, ConfigError> {
    if !path.exists() {
        log::debug!("No config at '{}', writing defaults.", path.display());
        let default_config = RosDevConfig::default();
        save_to(path, &default_config)?;
        return Ok(default_config);
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn save_to(path: &Path, config: &RosDevConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// The directory holding ROS distros, with `~` and `$VARS` expanded.
pub fn install_root(config: &RosDevConfig, platform: &dyn ShellPlatform) -> Result<PathBuf, ConfigError> {
    match &config.install_root {
        Some(template) => {
            let expanded = shellexpand::full(template).map_err(|e| ConfigError::Expand {
                template: template.clone(),
                message: e.to_string(),
            })?;
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => Ok(platform.default_install_root()),
    }
}

pub fn status_interval(config: &RosDevConfig) -> Duration {
    Duration::from_millis(
        config
            .status_interval_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_STATUS_INTERVAL_MS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::platform::Posix;

    #[test]
    fn test_load_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        let config = load_from(&path).unwrap();

        assert_eq!(config, RosDevConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let config = RosDevConfig {
            distro: Some("melodic".to_string()),
            ..Default::default()
        };

        save_to(&path, &config).unwrap();
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "distro = \"noetic\"\ncolour = \"blue\"\n").unwrap();

        assert!(matches!(load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_install_root_defaults_and_expands() {
        let default = install_root(&RosDevConfig::default(), &Posix).unwrap();
        assert_eq!(default, PathBuf::from("/opt/ros"));

        let custom = RosDevConfig {
            install_root: Some("/srv/ros".to_string()),
            ..Default::default()
        };
        assert_eq!(install_root(&custom, &Posix).unwrap(), PathBuf::from("/srv/ros"));
    }

    #[test]
    fn test_status_interval_ignores_zero() {
        let config = RosDevConfig {
            status_interval_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(
            status_interval(&config),
            Duration::from_millis(DEFAULT_STATUS_INTERVAL_MS)
        );
    }
}
