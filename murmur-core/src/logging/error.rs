//! Error types for the logging subsystem

use thiserror::Error;

/// Errors that can occur while installing the tracing subscriber
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// A global subscriber was already installed, or the registry refused ours
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// The configured level or filter directive could not be used
    #[error("Invalid logging configuration: {0}")]
    InvalidConfiguration(String),
}
