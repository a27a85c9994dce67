//! Configuration management for carelog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::SessionContext;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "carelog";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "carelog.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CARELOG_`)
/// 2. TOML config file at `~/.config/carelog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Session flags.
    pub session: SessionConfig,
    /// Identity written into structured daily logs.
    pub recorder: RecorderConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/carelog/carelog.db`
    pub database_path: Option<PathBuf>,
}

/// Session flags gating admin features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Admin mode enables the log viewer, category editor and name edits.
    pub admin_mode: bool,
    /// Whether the admin has authenticated.
    pub authenticated: bool,
    /// Whether records count as auto-saved.
    pub auto_save_enabled: bool,
}

/// Recorder identity and facility details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Staff identifier stored as `staff_id` and `authorId`.
    pub staff_id: String,
    /// Display name stored as `author` and `recorder_name`.
    pub recorder_name: String,
    /// Facility name shown in headers.
    pub facility_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            admin_mode: false,
            authenticated: false,
            auto_save_enabled: true,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            staff_id: "current-staff".to_string(),
            recorder_name: "記録者".to_string(),
            facility_name: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `CARELOG_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("CARELOG_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.recorder.staff_id.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "recorder.staff_id must not be empty".to_string(),
            });
        }

        if self.recorder.recorder_name.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "recorder.recorder_name must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Build the session context handed to the recorder.
    #[must_use]
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            admin_mode: self.session.admin_mode,
            authenticated: self.session.authenticated,
            auto_save_enabled: self.session.auto_save_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert!(!config.session.admin_mode);
        assert!(!config.session.authenticated);
        assert!(config.session.auto_save_enabled);
        assert_eq!(config.recorder.staff_id, "current-staff");
        assert_eq!(config.recorder.recorder_name, "記録者");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_staff_id() {
        let mut config = Config::default();
        config.recorder.staff_id = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("staff_id"));
    }

    #[test]
    fn test_validate_empty_recorder_name() {
        let mut config = Config::default();
        config.recorder.recorder_name = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("recorder_name"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("carelog.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/records.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/records.sqlite")
        );
    }

    #[test]
    fn test_session_context_from_config() {
        let mut config = Config::default();
        config.session.admin_mode = true;
        config.session.authenticated = true;

        let session = config.session_context();
        assert!(session.admin_mode);
        assert!(session.authenticated);
        assert!(session.auto_save_enabled);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("carelog"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("carelog_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[session]\nadmin_mode = true\n\n[recorder]\nrecorder_name = \"佐藤\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert!(config.session.admin_mode);
        assert_eq!(config.recorder.recorder_name, "佐藤");
        assert_eq!(config.recorder.staff_id, "current-staff");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_recorder_config_deserialize() {
        let json = r#"{"staff_id": "s-01"}"#;
        let recorder: RecorderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(recorder.staff_id, "s-01");
        assert_eq!(recorder.recorder_name, "記録者");
    }
}
