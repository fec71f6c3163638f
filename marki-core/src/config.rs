//! Configuration parsing and management.

use crate::converter::ConvertOptions;
use crate::rebuild::{FailurePolicy, RebuildOptions};
use crate::supervisor::RestartPolicy;
use crate::theme::{self, ThemeError, DEFAULT_THEME};
use crate::watch::{Backpressure, RebuildTriggers, WatchOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "marki.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("watch.queue_capacity must be at least 1")]
    QueueCapacity,
}

/// Main configuration struct matching the marki.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    #[serde(default = "default_true")]
    pub relocate_meta: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub watch: WatchConfig,

    // path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_source_extension() -> String {
    String::from("md")
}

fn default_output_extension() -> String {
    String::from("html")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub triggers: RebuildTriggers,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub backpressure: Backpressure,

    #[serde(default)]
    pub restart: RestartConfig,
}

fn default_queue_capacity() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_reset_after_secs")]
    pub reset_after_secs: u64,
}

fn default_max_restarts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_reset_after_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            output: None,
            theme: default_theme(),
            source_extension: default_source_extension(),
            output_extension: default_output_extension(),
            relocate_meta: true,
            failure_policy: FailurePolicy::default(),
            watch: WatchConfig::default(),
            config_path: None,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            triggers: RebuildTriggers::default(),
            queue_capacity: default_queue_capacity(),
            backpressure: Backpressure::default(),
            restart: RestartConfig::default(),
        }
    }
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            max_restarts: default_max_restarts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            reset_after_secs: default_reset_after_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Values are not validated here, since command-line overrides may still
    /// replace them. Call [`Config::validate`] once overrides are applied.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&contents)?
        };

        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load `explicit` if given, otherwise `marki.yml` in `dir` if present,
    /// otherwise built-in defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!("Loading config from {:?}", candidate);
            Self::from_file(candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        theme::validate(&self.theme)?;
        if self.watch.queue_capacity == 0 {
            return Err(ConfigError::QueueCapacity);
        }
        Ok(())
    }

    /// Source root, resolved relative to the config file
    pub fn source_dir(&self) -> Option<PathBuf> {
        self.source.as_deref().map(|p| self.resolve_path(p))
    }

    /// Output root, resolved relative to the config file
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn require_source(&self) -> Result<PathBuf, ConfigError> {
        self.source_dir()
            .ok_or_else(|| ConfigError::MissingField("source".to_string()))
    }

    pub fn require_output(&self) -> Result<PathBuf, ConfigError> {
        self.output_dir()
            .ok_or_else(|| ConfigError::MissingField("output".to_string()))
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            theme: self.theme.clone(),
            relocate_meta: self.relocate_meta,
        }
    }

    pub fn rebuild_options(&self, input_root: &Path, output_root: &Path) -> RebuildOptions {
        RebuildOptions {
            input_root: input_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            source_ext: self.source_extension.clone(),
            output_ext: self.output_extension.clone(),
            convert: self.convert_options(),
            failure_policy: self.failure_policy,
        }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            triggers: self.watch.triggers.clone(),
            queue_capacity: self.watch.queue_capacity,
            backpressure: self.watch.backpressure,
        }
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        let restart = &self.watch.restart;
        RestartPolicy {
            max_restarts: restart.max_restarts,
            initial_backoff: Duration::from_millis(restart.initial_backoff_ms),
            max_backoff: Duration::from_millis(restart.max_backoff_ms),
            reset_after: Duration::from_secs(restart.reset_after_secs),
        }
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_deref().and_then(Path::parent) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }
}
