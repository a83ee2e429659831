//! Configuration management for dojokeeper.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::dashboard::{DEFAULT_BIRTHDAY_WINDOW_DAYS, DEFAULT_RECENT_ENROLLMENTS};
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "dojokeeper";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "roster.db";

/// Largest degree count a martial art may be created with by default.
pub const MAX_DEGREES_LIMIT: u32 = crate::model::MAX_DEGREES;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DOJOKEEPER_`)
/// 2. TOML config file at `~/.config/dojokeeper/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Dashboard configuration.
    pub dashboard: DashboardConfig,
    /// Defaults for new martial arts.
    pub martial_arts: MartialArtDefaults,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the roster database.
    /// Defaults to `~/.local/share/dojokeeper/roster.db`
    pub database_path: Option<PathBuf>,
}

/// Dashboard-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// How many days ahead to list birthdays.
    pub birthday_window_days: u32,
    /// How many recent enrollments to list.
    pub recent_enrollments: usize,
}

/// Defaults applied when a martial art is added without explicit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MartialArtDefaults {
    /// Degrees per rank for arts that use degrees.
    pub default_max_degrees: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            birthday_window_days: DEFAULT_BIRTHDAY_WINDOW_DAYS,
            recent_enrollments: DEFAULT_RECENT_ENROLLMENTS,
        }
    }
}

impl Default for MartialArtDefaults {
    fn default() -> Self {
        Self {
            default_max_degrees: 4,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
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
            .merge(Env::prefixed("DOJOKEEPER_").split("__"));

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
        if self.dashboard.birthday_window_days == 0 {
            return Err(Error::ConfigValidation {
                message: "birthday_window_days must be greater than 0".to_string(),
            });
        }

        if self.dashboard.recent_enrollments == 0 {
            return Err(Error::ConfigValidation {
                message: "recent_enrollments must be greater than 0".to_string(),
            });
        }

        if self.martial_arts.default_max_degrees > MAX_DEGREES_LIMIT {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_max_degrees ({}) cannot be greater than {MAX_DEGREES_LIMIT}",
                    self.martial_arts.default_max_degrees
                ),
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
}
