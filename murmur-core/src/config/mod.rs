//! Client configuration
//!
//! Defaults, environment overrides (`MURMUR_<SECTION>_<KEY>`), TOML files and
//! validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::codecs::{ContentTypeId, DEFAULT_MAX_DECOMPRESSED_SIZE};

mod error;

pub use error::ConfigError;

/// Top-level configuration for a [`Client`](crate::client::Client)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Live message stream configuration
    pub stream: StreamConfig,

    /// Content codec configuration
    pub codecs: CodecConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Live stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Capacity of the channel between the stream producer task and the consumer
    pub buffer_capacity: usize,
}

/// Codec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Content type used when a send does not name one (`authority/type:major.minor`)
    pub default_content_type: String,
    /// Largest payload a compressed message may inflate to, in bytes
    pub max_decompressed_bytes: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json_format: false, with_timestamp: true, with_target: true }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { buffer_capacity: 256 }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            default_content_type: ContentTypeId::text().to_string(),
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl CodecConfig {
    /// Parsed form of `default_content_type`
    pub fn default_content_type(&self) -> Result<ContentTypeId, ConfigError> {
        self.default_content_type.parse().map_err(|e| {
            ConfigError::InvalidValue(format!(
                "Invalid default content type '{}': {}",
                self.default_content_type, e
            ))
        })
    }
}

impl ClientConfig {
    /// Load configuration from environment variables on top of the defaults
    ///
    /// Example: `MURMUR_STREAM_BUFFER_CAPACITY=64`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(level) = env::var("MURMUR_LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }
        if let Ok(json) = env::var("MURMUR_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }
        if let Ok(capacity) = env::var("MURMUR_STREAM_BUFFER_CAPACITY") {
            config.stream.buffer_capacity = capacity.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid stream buffer capacity: {}", e))
            })?;
        }
        if let Ok(content_type) = env::var("MURMUR_CODECS_DEFAULT_CONTENT_TYPE") {
            config.codecs.default_content_type = content_type;
        }
        if let Ok(limit) = env::var("MURMUR_CODECS_MAX_DECOMPRESSED_BYTES") {
            config.codecs.max_decompressed_bytes = limit.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid decompression limit: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        if self.stream.buffer_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "stream.buffer_capacity must be greater than 0".to_string(),
            ));
        }

        if self.codecs.max_decompressed_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "codecs.max_decompressed_bytes must be greater than 0".to_string(),
            ));
        }

        self.codecs.default_content_type()?;

        Ok(())
    }
}
