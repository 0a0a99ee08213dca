//! Emoji reactions referencing an earlier message

use serde::{Deserialize, Serialize};

use super::{CodecError, CodecResult, Content, ContentCodec, ContentTypeId, EncodedContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionSchema {
    Unicode,
    Shortcode,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Hex id of the message being reacted to
    pub reference: String,
    pub action: ReactionAction,
    pub schema: ReactionSchema,
    pub content: String,
}

/// JSON-payload reaction codec
#[derive(Debug, Default, Clone, Copy)]
pub struct ReactionCodec;

impl ContentCodec for ReactionCodec {
    fn content_type(&self) -> ContentTypeId {
        ContentTypeId::reaction()
    }

    fn encode(&self, content: &Content) -> CodecResult<EncodedContent> {
        match content {
            Content::Reaction(reaction) => {
                let payload = serde_json::to_vec(reaction).map_err(|e| CodecError::Encoding(e.to_string()))?;
                Ok(EncodedContent::new(self.content_type(), payload))
            }
            other => Err(self.invalid(other)),
        }
    }

    fn decode(&self, encoded: &EncodedContent) -> CodecResult<Content> {
        serde_json::from_slice(&encoded.content)
            .map(Content::Reaction)
            .map_err(|e| CodecError::Decoding(e.to_string()))
    }

    fn fallback(&self, content: &Content) -> CodecResult<Option<String>> {
        match content {
            Content::Reaction(reaction) => Ok(Some(match reaction.action {
                ReactionAction::Added => format!("Reacted “{}” to an earlier message", reaction.content),
                ReactionAction::Removed => format!("Removed “{}” from an earlier message", reaction.content),
            })),
            other => Err(self.invalid(other)),
        }
    }
}
