//! Error types for content codecs

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding, decoding or compressing content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The content value does not match the variant the selected codec handles
    #[error("Invalid content: codec {codec} cannot handle {found} content")]
    InvalidContent { codec: String, found: &'static str },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Decoding failed: {0}")]
    Decoding(String),

    #[error("Compression failed: {0}")]
    Compression(String),

    /// A content type identifier could not be parsed
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
}

impl From<bincode::Error> for CodecError {
    fn from(e: bincode::Error) -> Self {
        CodecError::Decoding(e.to_string())
    }
}
