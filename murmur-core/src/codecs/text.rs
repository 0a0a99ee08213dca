//! Plain UTF-8 text codec

use super::{CodecError, CodecResult, Content, ContentCodec, ContentTypeId, EncodedContent};

const ENCODING_PARAM: &str = "encoding";
const UTF8: &str = "UTF-8";

#[derive(Debug, Default, Clone, Copy)]
pub struct TextCodec;

impl ContentCodec for TextCodec {
    fn content_type(&self) -> ContentTypeId {
        ContentTypeId::text()
    }

    fn encode(&self, content: &Content) -> CodecResult<EncodedContent> {
        match content {
            Content::Text(text) => Ok(EncodedContent::new(self.content_type(), text.as_bytes().to_vec())
                .with_parameter(ENCODING_PARAM, UTF8)),
            other => Err(self.invalid(other)),
        }
    }

    fn decode(&self, encoded: &EncodedContent) -> CodecResult<Content> {
        if let Some(encoding) = encoded.parameters.get(ENCODING_PARAM) {
            if !encoding.eq_ignore_ascii_case(UTF8) {
                return Err(CodecError::Decoding(format!("unrecognized text encoding {}", encoding)));
            }
        }

        String::from_utf8(encoded.content.clone())
            .map(Content::Text)
            .map_err(|e| CodecError::Decoding(e.to_string()))
    }

    fn fallback(&self, content: &Content) -> CodecResult<Option<String>> {
        match content {
            Content::Text(_) => Ok(None),
            other => Err(self.invalid(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{Reaction, ReactionAction, ReactionSchema};

    #[test]
    fn test_text_roundtrip() {
        let codec = TextCodec;
        let encoded = codec.encode(&Content::from("hello")).unwrap();
        assert_eq!(encoded.parameters.get("encoding").map(String::as_str), Some("UTF-8"));
        assert_eq!(codec.decode(&encoded).unwrap(), Content::from("hello"));
    }

    #[test]
    fn test_text_rejects_other_content() {
        let reaction = Content::Reaction(Reaction {
            reference: "00".to_string(),
            action: ReactionAction::Added,
            schema: ReactionSchema::Unicode,
            content: "👍".to_string(),
        });
        assert!(matches!(TextCodec.encode(&reaction), Err(CodecError::InvalidContent { .. })));
        assert!(matches!(TextCodec.fallback(&reaction), Err(CodecError::InvalidContent { .. })));
    }

    #[test]
    fn test_text_decode_invalid_utf8() {
        let encoded = EncodedContent::new(ContentTypeId::text(), vec![0xff, 0xfe]);
        assert!(matches!(TextCodec.decode(&encoded), Err(CodecError::Decoding(_))));
    }

    #[test]
    fn test_text_decode_unknown_encoding() {
        let encoded = EncodedContent::new(ContentTypeId::text(), b"hi".to_vec())
            .with_parameter("encoding", "UTF-16");
        assert!(TextCodec.decode(&encoded).is_err());
    }
}
