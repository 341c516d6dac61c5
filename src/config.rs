use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Seconds between re-fires of a recurring reminder
    #[serde(default = "default_repeat_interval_secs")]
    pub repeat_interval_secs: u64,
    /// Whether alarms may fire at the exact scheduled time; when false every
    /// one-shot alarm uses the inexact fallback
    #[serde(default = "default_true")]
    pub exact_alarms: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub sound_file: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_cancel_recurring")]
    pub cancel_recurring: String,
    #[serde(default = "default_done")]
    pub done: String,
    #[serde(default = "default_dismiss")]
    pub dismiss: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_save")]
    pub save: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default)]
    pub highlight_fg: String,
    #[serde(default = "default_error_fg")]
    pub error_fg: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            repeat_interval_secs: default_repeat_interval_secs(),
            exact_alarms: true,
            notifications_enabled: true,
            sound_enabled: true,
            sound_file: None,
            log_level: default_log_level(),
            time_format: default_time_format(),
            key_bindings: KeyBindings::default(),
            theme: Theme::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new: default_new(),
            delete: default_delete(),
            cancel_recurring: default_cancel_recurring(),
            done: default_done(),
            dismiss: default_dismiss(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            help: default_help(),
            save: default_save(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: String::new(),
            error_fg: default_error_fg(),
        }
    }
}

// Default value functions
fn default_database_path() -> String {
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("reminders.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/taskrem/reminders.db".to_string()
    }
}

fn default_repeat_interval_secs() -> u64 {
    crate::scheduler::DEFAULT_REPEAT_INTERVAL.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_time_format() -> String {
    "%a %d %b %I:%M %p".to_string()
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_cancel_recurring() -> String {
    "c".to_string()
}

fn default_done() -> String {
    "y".to_string()
}

fn default_dismiss() -> String {
    "x".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_error_fg() -> String {
    "red".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from the profile's config file, creating it with
    /// defaults if missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        let mut config = Self::load_from_path(&config_path)?;
        if !Self::database_path_is_custom(&config.database_path) {
            config.database_path = Self::default_database_path_for_profile(profile);
        }
        Ok(config)
    }

    /// Load configuration from an explicit file, creating it with defaults if missing
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            toml::from_str::<Config>(&contents)?
        } else {
            let mut config = Config::default();
            if let Err(e) = config.save_to_path(path) {
                tracing::error!(path = %path.display(), error = %e, "failed to save default config");
                return Err(e);
            }
            config
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.repeat_interval_secs == 0 {
            return Err(ConfigError::Invalid("repeat_interval_secs must be greater than zero".to_string()));
        }
        for binding in [
            &self.key_bindings.quit,
            &self.key_bindings.new,
            &self.key_bindings.delete,
            &self.key_bindings.cancel_recurring,
            &self.key_bindings.done,
            &self.key_bindings.dismiss,
            &self.key_bindings.list_up,
            &self.key_bindings.list_down,
            &self.key_bindings.help,
            &self.key_bindings.save,
        ] {
            utils::parse_key_binding(binding).map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    /// Save configuration to the given file
    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// A database path the user set by hand is kept; the generated default is
    /// swapped for the active profile's
    fn database_path_is_custom(path: &str) -> bool {
        path != default_database_path()
            && path != Self::default_database_path_for_profile(utils::Profile::Dev)
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("reminders.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/taskrem-dev/reminders.db".to_string(),
                utils::Profile::Prod => "~/.local/share/taskrem/reminders.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Log file sits next to the database
    pub fn get_log_path(&self) -> PathBuf {
        let db_path = self.get_database_path();
        match db_path.parent() {
            Some(parent) => parent.join("taskrem.log"),
            None => PathBuf::from("taskrem.log"),
        }
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_secs(self.repeat_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let config = Config::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.repeat_interval_secs, 120);
        assert_eq!(config.repeat_interval(), Duration::from_secs(120));
        assert!(config.exact_alarms);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "repeat_interval_secs = 30\nexact_alarms = false\n\n[key_bindings]\nquit = \"Q\"\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.repeat_interval_secs, 30);
        assert!(!config.exact_alarms);
        assert_eq!(config.key_bindings.quit, "Q");
        assert_eq!(config.key_bindings.new, "n");
        assert_eq!(config.theme.fg, "white");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "repeat_interval_secs = 0\n").unwrap();
        assert!(matches!(Config::load_from_path(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_key_binding_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[key_bindings]\nnew = \"Meta+n\"\n").unwrap();
        assert!(matches!(Config::load_from_path(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn log_file_sits_next_to_database() {
        let config = Config {
            database_path: "/var/tmp/taskrem/reminders.db".to_string(),
            ..Config::default()
        };
        assert_eq!(config.get_log_path(), PathBuf::from("/var/tmp/taskrem/taskrem.log"));
    }
}
