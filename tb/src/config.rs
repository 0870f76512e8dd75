//! teamboard configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::loader::{DEFAULT_MAX_BATCH, DEFAULT_WAIT};

/// Main teamboard configuration
///
/// Built once at startup and handed to every component that needs it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application identity
    pub app: AppConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Live event delivery
    pub events: EventsConfig,

    /// Per-request batched loading
    pub loader: LoaderConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.events.channel_capacity == 0 {
            return Err(eyre::eyre!("events.channel-capacity must be at least 1"));
        }
        if self.loader.max_batch == 0 {
            return Err(eyre::eyre!("loader.max-batch must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .teamboard.yml
        let local_config = PathBuf::from(".teamboard.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/teamboard/teamboard.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("teamboard").join("teamboard.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Application identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name used in logs and the log directory
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "teamboard".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); the CLI flag wins
    pub level: Option<String>,
}

/// Live event delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Undelivered events buffered per subscriber before publishers wait
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Per-request batched loading
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Debounce window in milliseconds
    #[serde(rename = "wait-ms")]
    pub wait_ms: u64,

    /// Largest batch sent to a repository in one fetch
    #[serde(rename = "max-batch")]
    pub max_batch: usize,
}

impl LoaderConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            wait_ms: DEFAULT_WAIT.as_millis() as u64,
            max_batch: DEFAULT_MAX_BATCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app.name, "teamboard");
        assert_eq!(config.events.channel_capacity, 1);
        assert_eq!(config.loader.wait_ms, 1);
        assert_eq!(config.loader.max_batch, 100);
        assert!(config.log.level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "app:\n  name: board-test\nlog:\n  level: debug\nevents:\n  channel-capacity: 4\nloader:\n  wait-ms: 5\n  max-batch: 25"
        )
        .unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.app.name, "board-test");
        assert_eq!(config.log.level.as_deref(), Some("debug"));
        assert_eq!(config.events.channel_capacity, 4);
        assert_eq!(config.loader.wait(), Duration::from_millis(5));
        assert_eq!(config.loader.max_batch, 25);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "loader:\n  wait-ms: 3").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.loader.wait_ms, 3);
        assert_eq!(config.loader.max_batch, 100);
        assert_eq!(config.events.channel_capacity, 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "events:\n  channel-capacity: 0").unwrap();

        let err = Config::load(Some(&file.path().to_path_buf())).unwrap_err();
        assert!(format!("{:#}", err).contains("channel-capacity"));
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let path = PathBuf::from("/nonexistent/teamboard.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("channel-capacity"));
        assert!(yaml.contains("wait-ms"));
    }
}
