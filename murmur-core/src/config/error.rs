//! Error types for client configuration

use thiserror::Error;

/// Errors raised while loading, saving or validating a [`ClientConfig`](super::ClientConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML file could not be read
    #[error("Cannot read config file: {0}")]
    FileReadError(String),

    #[error("Cannot write config file: {0}")]
    FileWriteError(String),

    /// The file contents are not valid TOML for `ClientConfig`
    #[error("Malformed config: {0}")]
    ParseError(String),

    #[error("Cannot serialize config: {0}")]
    SerializeError(String),

    /// A single setting (usually from the environment) has an unusable value
    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    /// Settings parsed but violate a constraint such as a non-zero buffer
    #[error("Config validation failed: {0}")]
    ValidationFailed(String),
}
