//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Pre-training delay and countdown warning threshold
//! - Which sound cues play
//! - Default work/rest times for new trainings
//!
//! Configuration is stored at `~/.config/intervals/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};

/// Playback timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Seconds of "get ready" before the first exercise.
    #[serde(default = "default_start_delay")]
    pub training_start_delay_secs: u32,
    /// Remaining seconds within which the countdown cue ticks. 0 disables it.
    #[serde(default = "default_countdown")]
    pub countdown_to_change: u32,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

/// Per-cue sound switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundFlags {
    #[serde(default = "default_true")]
    pub training_start: bool,
    #[serde(default = "default_true")]
    pub exercise_start: bool,
    #[serde(default = "default_true")]
    pub rest_start: bool,
    #[serde(default = "default_true")]
    pub countdown: bool,
    #[serde(default = "default_true")]
    pub training_end: bool,
}

/// Defaults applied to new trainings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_time")]
    pub time_secs: u32,
    #[serde(default = "default_rest")]
    pub rest_secs: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/intervals/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub sounds: SoundFlags,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Read-only settings snapshot consumed by the playback engine.
///
/// `Default` is what playback uses while the real settings are unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    pub training_start_delay_secs: u32,
    pub countdown_to_change: u32,
    pub sounds: SoundFlags,
}

// Default functions
fn default_start_delay() -> u32 {
    5
}
fn default_countdown() -> u32 {
    3
}
fn default_tick_interval() -> u64 {
    25
}
fn default_true() -> bool {
    true
}
fn default_time() -> u32 {
    30
}
fn default_rest() -> u32 {
    10
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            training_start_delay_secs: default_start_delay(),
            countdown_to_change: default_countdown(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl Default for SoundFlags {
    fn default() -> Self {
        Self {
            training_start: true,
            exercise_start: true,
            rest_start: true,
            countdown: true,
            training_end: true,
        }
    }
}

impl SoundFlags {
    pub fn all_off() -> Self {
        Self {
            training_start: false,
            exercise_start: false,
            rest_start: false,
            countdown: false,
            training_end: false,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            time_secs: default_time(),
            rest_secs: default_rest(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Config::default().settings()
    }
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

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;
        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                    .into(),
            ),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                return Err(invalid("not a leaf setting".into()));
            }
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// [`Config::load`] against an explicit file.
    ///
    /// # Errors
    ///
    /// Any read failure other than a missing file is reported, and the
    /// file is left as it is.
    pub fn load_from(path: &Path) -> Result<Self> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| load_failed(e.to_string()).into()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string()).into()),
        }
    }

    /// Persist to disk.
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

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// as the key's type.
    pub fn update(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| {
            CoreError::from(ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(())
    }

    /// Set a value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.update(key, value)?;
        self.save()
    }

    /// Snapshot of the settings playback reads.
    pub fn settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            training_start_delay_secs: self.playback.training_start_delay_secs,
            countdown_to_change: self.playback.countdown_to_change,
            sounds: self.sounds,
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("using default configuration: {e}");
                Self::default()
            }
        }
    }
}
