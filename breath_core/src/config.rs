//! Configuration file support.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/breathe/config.toml`.
//! Every section is optional.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "breathe";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub exercises: ExercisesConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Live playback options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Logical clock step per host tick
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_true")]
    pub sound_enabled: bool,

    #[serde(default = "default_true")]
    pub haptics_enabled: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            sound_enabled: true,
            haptics_enabled: true,
        }
    }
}

/// Defaults for offline schedules
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    #[serde(default = "default_loops")]
    pub loops: u32,

    #[serde(default)]
    pub delay_seconds: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            loops: default_loops(),
            delay_seconds: 0.0,
        }
    }
}

/// Exercise catalog source
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ExercisesConfig {
    /// JSON catalog replacing the built-in exercises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// Default value functions
fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir().join(".local/share"));
    base.join(APP_DIR)
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_loops() -> u32 {
    1
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.check()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"));
        base.join(APP_DIR).join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.playback.tick_interval_ms == 0 {
            return Err(Error::Config("playback.tick_interval_ms must be > 0".into()));
        }
        if self.render.loops == 0 {
            return Err(Error::Config("render.loops must be >= 1".into()));
        }
        if !self.render.delay_seconds.is_finite() || self.render.delay_seconds < 0.0 {
            return Err(Error::Config(format!(
                "render.delay_seconds must be >= 0, got {}",
                self.render.delay_seconds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.playback.tick_interval_ms, 100);
        assert!(config.playback.sound_enabled);
        assert_eq!(config.render.loops, 1);
        assert!(config.exercises.file.is_none());
        assert!(config.data.data_dir.ends_with("breathe"));
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.render.loops = 3;
        config.exercises.file = Some(dir.path().join("exercises.json"));
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[playback]
sound_enabled = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.playback.sound_enabled);
        assert!(config.playback.haptics_enabled); // default
        assert_eq!(config.playback.tick_interval_ms, 100); // default
    }

    #[test]
    fn test_rejects_zero_loops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[render]\nloops = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
