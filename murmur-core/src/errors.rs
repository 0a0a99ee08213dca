//! Error types for the client layer

use thiserror::Error;

use crate::codecs::CodecError;
use crate::consent::ConsentError;
use crate::engine::EngineError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by [`Group`](crate::group::Group) and [`Client`](crate::client::Client)
#[derive(Error, Debug)]
pub enum ClientError {
    /// Content could not be encoded, compressed or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The group engine reported a failure
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A message from the engine could not be turned into a client message
    #[error("Transcode error: {0}")]
    Transcode(String),

    /// Consent lookup or update failed
    #[error("Consent error: {0}")]
    Consent(#[from] ConsentError),

    /// Client construction was given an unusable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl ClientError {
    /// True when the failure came from the engine
    pub fn is_engine(&self) -> bool {
        matches!(self, ClientError::Engine(_))
    }
}
