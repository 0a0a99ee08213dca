//! Content codecs
//!
//! Application content is a closed set of [`Content`] variants. Each codec
//! handles one variant and is registered under its content type; the
//! [`CodecRegistry`] resolves a content type to a codec, falling back to the
//! passthrough codec for types it does not know.
//!
//! ```text
//! Content ──encode──► EncodedContent ──compress?──► bytes ──► engine
//! engine ──► bytes ──► EncodedContent ──decompress──decode──► Content
//! ```

mod content_type;
mod encoded;
mod error;
mod passthrough;
mod reaction;
mod registry;
mod text;

pub use content_type::{ContentTypeId, BUILTIN_AUTHORITY};
pub use encoded::{Compression, EncodedContent, DEFAULT_MAX_DECOMPRESSED_SIZE};
pub use error::{CodecError, CodecResult};
pub use passthrough::PassthroughCodec;
pub use reaction::{Reaction, ReactionAction, ReactionCodec, ReactionSchema};
pub use registry::CodecRegistry;
pub use text::TextCodec;

/// Typed application content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Reaction(Reaction),
    /// Content of a type this client has no codec for, kept as received
    Raw(EncodedContent),
}

impl Content {
    /// Short variant name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Reaction(_) => "reaction",
            Content::Raw(_) => "raw",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Reaction> for Content {
    fn from(reaction: Reaction) -> Self {
        Content::Reaction(reaction)
    }
}

impl From<EncodedContent> for Content {
    fn from(encoded: EncodedContent) -> Self {
        Content::Raw(encoded)
    }
}

/// Converts one [`Content`] variant to and from [`EncodedContent`]
///
/// Passing a variant the codec does not handle fails with
/// [`CodecError::InvalidContent`].
pub trait ContentCodec: Send + Sync {
    fn content_type(&self) -> ContentTypeId;

    fn encode(&self, content: &Content) -> CodecResult<EncodedContent>;

    fn decode(&self, encoded: &EncodedContent) -> CodecResult<Content>;

    /// Text shown by clients that cannot decode this content type
    fn fallback(&self, content: &Content) -> CodecResult<Option<String>>;

    /// Error for a content variant this codec does not handle
    fn invalid(&self, content: &Content) -> CodecError {
        CodecError::InvalidContent { codec: self.content_type().to_string(), found: content.kind() }
    }
}
