//! Error types reported by group engines

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures reported by a [`GroupEngine`](super::GroupEngine)
///
/// The client layer never rewrites these; they reach callers as
/// [`ClientError::Engine`](crate::errors::ClientError::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Publishing or fetching over the network failed
    #[error("Network error: {0}")]
    Network(String),

    /// The secure group protocol rejected an operation or message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An account address was malformed or not reachable
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A group, member or message does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine cannot serve requests right now
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

impl From<bincode::Error> for EngineError {
    fn from(e: bincode::Error) -> Self {
        EngineError::Protocol(format!("malformed envelope: {}", e))
    }
}
