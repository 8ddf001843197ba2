//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The daily anchor time and cycle length
//! - When the reminder job fires and the time after which it may remind
//! - Whether notifications are permitted
//!
//! Configuration is stored at `<data dir>/config.toml`.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::cycles::{CycleClock, DEFAULT_CYCLE_MINUTES};
use crate::error::{ConfigError, Result};

/// Cycle counting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Daily anchor, `HH:MM`.
    #[serde(default = "default_anchor")]
    pub anchor: String,
    #[serde(default = "default_length_minutes")]
    pub length_minutes: u32,
}

/// Reminder job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Time of day the reminder job fires, `HH:MM`.
    #[serde(default = "default_reminder_time")]
    pub time: String,
    /// The reminder is only emitted after this time of day, `HH:MM`.
    #[serde(default = "default_anchor")]
    pub threshold: String,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Permission to post reminders. When false the reminder job stays quiet.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_anchor() -> String {
    "19:30".into()
}
fn default_length_minutes() -> u32 {
    DEFAULT_CYCLE_MINUTES
}
fn default_reminder_time() -> String {
    "20:00".into()
}
fn default_true() -> bool {
    true
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            anchor: default_anchor(),
            length_minutes: default_length_minutes(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            time: default_reminder_time(),
            threshold: default_anchor(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Parse `HH:MM` (or `HH:MM:SS`) for the config key `key`.
pub fn parse_time_of_day(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected HH:MM, got '{value}'"),
        })
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u32>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => return Err(
                        invalid("cannot replace a whole section".to_string()),
                    ),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is
    /// invalid, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check that every time field parses and the cycle length is non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cycle_clock()?;
        self.reminder_time()?;
        self.reminder_threshold()?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// or fails validation. `self` is unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// The anchor and cycle length as a [`CycleClock`].
    pub fn cycle_clock(&self) -> Result<CycleClock, ConfigError> {
        let anchor = parse_time_of_day("cycle.anchor", &self.cycle.anchor)?;
        CycleClock::new(anchor, self.cycle.length_minutes).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "cycle.length_minutes".into(),
                message: "must be greater than zero".into(),
            }
        })
    }

    pub fn reminder_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time_of_day("reminder.time", &self.reminder.time)
    }

    pub fn reminder_threshold(&self) -> Result<NaiveTime, ConfigError> {
        parse_time_of_day("reminder.threshold", &self.reminder.threshold)
    }
}
