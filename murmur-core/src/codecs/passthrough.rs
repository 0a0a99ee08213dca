//! Default codec for content types without a registered codec

use super::{CodecResult, Content, ContentCodec, ContentTypeId, EncodedContent};

/// Carries [`Content::Raw`] envelopes through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCodec;

impl ContentCodec for PassthroughCodec {
    fn content_type(&self) -> ContentTypeId {
        ContentTypeId::passthrough()
    }

    fn encode(&self, content: &Content) -> CodecResult<EncodedContent> {
        match content {
            Content::Raw(encoded) => Ok(encoded.clone()),
            other => Err(self.invalid(other)),
        }
    }

    fn decode(&self, encoded: &EncodedContent) -> CodecResult<Content> {
        Ok(Content::Raw(encoded.clone()))
    }

    fn fallback(&self, content: &Content) -> CodecResult<Option<String>> {
        match content {
            Content::Raw(encoded) => Ok(encoded.fallback.clone()),
            other => Err(self.invalid(other)),
        }
    }
}
