//! Configuration management for the rsauthz server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults. Nested keys use `__` as separator:
//! `RSAUTHZ_RECONCILER__WORKERS=8` sets `reconciler.workers`.
//!
//! # Example
//!
//! ```ignore
//! use rsauthz_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("config.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "RSAUTHZ";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Decision engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub reconciler: ReconcilerSettings,

    /// Caller authorization settings
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format for logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Decision engine settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EngineSettings {
    /// Resolve List through the store's streaming ListObjects.
    #[serde(default)]
    pub use_streamed_list_objects: bool,

    /// Buffer between the object stream and the collecting task.
    #[serde(default = "default_list_stream_buffer")]
    pub list_stream_buffer: usize,

    /// Page size for reads issued by the engine itself.
    #[serde(default = "default_page_size")]
    pub read_page_size: u32,

    #[serde(default = "default_max_batch_check_items")]
    pub max_batch_check_items: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            use_streamed_list_objects: false,
            list_stream_buffer: default_list_stream_buffer(),
            read_page_size: default_page_size(),
            max_batch_check_items: default_max_batch_check_items(),
        }
    }
}

fn default_list_stream_buffer() -> usize {
    100
}

fn default_page_size() -> u32 {
    100
}

fn default_max_batch_check_items() -> usize {
    50
}

/// Reconciler settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReconcilerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between namespace enumerations.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the namespace queue. Enumeration blocks when it is full.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Tuples per write request.
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,

    #[serde(default = "default_page_size")]
    pub read_page_size: u32,

    /// Page size when listing declarative objects.
    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            workers: default_workers(),
            queue_size: default_queue_size(),
            write_batch_size: default_write_batch_size(),
            read_page_size: default_page_size(),
            list_page_size: default_list_page_size(),
        }
    }
}

impl ReconcilerSettings {
    /// Tick interval, at least one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    30
}

fn default_workers() -> usize {
    4
}

fn default_queue_size() -> usize {
    1000
}

fn default_write_batch_size() -> usize {
    100
}

fn default_list_page_size() -> u32 {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthSettings {
    /// Permission a caller must hold to mutate tuples.
    #[serde(default = "default_write_permission")]
    pub write_permission: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            write_permission: default_write_permission(),
        }
    }
}

fn default_write_permission() -> String {
    "authz:write".to_string()
}

/// Configuration loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// Failed to load configuration
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    /// Configuration file not found
    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

impl ServerConfig {
    /// Loads configuration from a YAML file with environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Loads configuration from environment variables only (with defaults).
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        let positive = [
            ("engine.list_stream_buffer", self.engine.list_stream_buffer),
            ("engine.read_page_size", self.engine.read_page_size as usize),
            (
                "engine.max_batch_check_items",
                self.engine.max_batch_check_items,
            ),
            ("reconciler.interval_secs", self.reconciler.interval_secs as usize),
            ("reconciler.workers", self.reconciler.workers),
            ("reconciler.queue_size", self.reconciler.queue_size),
            ("reconciler.write_batch_size", self.reconciler.write_batch_size),
            ("reconciler.read_page_size", self.reconciler.read_page_size as usize),
            ("reconciler.list_page_size", self.reconciler.list_page_size as usize),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigLoadError::Invalid {
                    message: format!("{name} must be greater than 0"),
                });
            }
        }

        if self.auth.write_permission.trim().is_empty() {
            return Err(ConfigLoadError::Invalid {
                message: "auth.write_permission cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
