use crate::parser::ParserOptions;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while interpreting configuration values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),
    #[error("Default hour out of range: {0} (must be 0-23)")]
    InvalidDefaultHour(u32),
    #[error("PM assumption limit out of range: {0} (must be 0-11)")]
    InvalidPmLimit(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Hour used when the text names a day but no time
    #[serde(default = "default_hour")]
    pub default_hour: u32,
    /// Bare hours from 1 through this value are read as PM; 0 turns the heuristic off
    #[serde(default = "default_assume_pm_through")]
    pub assume_pm_through: u32,
    /// IANA zone name used for "now" and for UNTIL conversion; system zone when unset
    #[serde(default)]
    pub timezone: Option<String>,
}

fn default_hour() -> u32 {
    8
}

fn default_assume_pm_through() -> u32 {
    7
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_hour: default_hour(),
            assume_pm_through: default_assume_pm_through(),
            timezone: None,
        }
    }
}

impl ParserConfig {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path, writing defaults there if nothing exists yet
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let default_config = ParserConfig::default();
            default_config.save_to(config_path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;
        let config: ParserConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_hour > 23 {
            return Err(ConfigError::InvalidDefaultHour(self.default_hour));
        }
        if self.assume_pm_through > 11 {
            return Err(ConfigError::InvalidPmLimit(self.assume_pm_through));
        }
        self.tz()?;
        Ok(())
    }

    /// The configured zone, if any
    pub fn tz(&self) -> Result<Option<Tz>, ConfigError> {
        match &self.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map(Some)
                .map_err(|_| ConfigError::UnknownTimezone(name.clone())),
            None => Ok(None),
        }
    }

    /// Current wall-clock time in the configured zone
    pub fn now(&self) -> Result<NaiveDateTime, ConfigError> {
        Ok(match self.tz()? {
            Some(tz) => chrono::Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        })
    }

    pub fn options(&self) -> ParserOptions {
        ParserOptions {
            default_hour: self.default_hour,
            assume_pm_through: self.assume_pm_through,
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "remindly", "remindly")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = ParserConfig::default();
        assert_eq!(config.default_hour, 8);
        assert_eq!(config.assume_pm_through, 7);
        assert!(config.timezone.is_none());

        let options = config.options();
        assert_eq!(options, ParserOptions::default());
    }

    #[test]
    fn test_config_save_load() -> Result<()> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("remindly").join("config.toml");

        let config = ParserConfig {
            default_hour: 9,
            assume_pm_through: 5,
            timezone: Some("Europe/Berlin".to_string()),
        };
        config.save_to(&config_path)?;

        let loaded = ParserConfig::load_from(&config_path)?;
        assert_eq!(loaded, config);
        assert_eq!(loaded.tz()?, Some(chrono_tz::Europe::Berlin));

        Ok(())
    }

    #[test]
    fn test_missing_config_writes_defaults() -> Result<()> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("config.toml");

        let loaded = ParserConfig::load_from(&config_path)?;
        assert_eq!(loaded, ParserConfig::default());
        assert!(config_path.exists());

        Ok(())
    }

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "assume_pm_through = 0\n")?;

        let loaded = ParserConfig::load_from(&config_path)?;
        assert_eq!(loaded.default_hour, 8);
        assert_eq!(loaded.assume_pm_through, 0);

        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ParserConfig { timezone: Some("Mars/Olympus".to_string()), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTimezone(_))));

        let config = ParserConfig { default_hour: 24, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDefaultHour(24))));

        let config = ParserConfig { assume_pm_through: 12, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPmLimit(12))));
    }
}
