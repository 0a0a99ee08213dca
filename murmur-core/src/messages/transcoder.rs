//! Engine message to client message conversion

use std::sync::Arc;
use tracing::warn;

use super::{timestamp_from_ns, DecodedMessage, DecryptedMessage};
use crate::codecs::{CodecRegistry, EncodedContent, DEFAULT_MAX_DECOMPRESSED_SIZE};
use crate::engine::EngineMessage;
use crate::errors::{ClientError, ClientResult};

/// Converts engine messages using a client's codec registry
///
/// `decode` and `decrypt` fail with [`ClientError::Transcode`]; the `_or_none`
/// variants log the failure and return `None` for bulk and streaming callers.
#[derive(Debug, Clone)]
pub struct MessageTranscoder {
    codecs: Arc<CodecRegistry>,
    max_decompressed_bytes: usize,
}

impl MessageTranscoder {
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self { codecs, max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_SIZE }
    }

    /// Cap on the inflated size of compressed payloads
    pub fn with_max_decompressed_bytes(mut self, limit: usize) -> Self {
        self.max_decompressed_bytes = limit;
        self
    }

    pub fn decode(&self, message: &EngineMessage) -> ClientResult<DecodedMessage> {
        let encoded = parse(message)?
            .decompress_with_limit(self.max_decompressed_bytes)
            .map_err(|e| transcode_error(message, e))?;
        let codec = self.codecs.find(Some(&encoded.content_type));
        let content = codec.decode(&encoded).map_err(|e| transcode_error(message, e))?;

        Ok(DecodedMessage {
            id: message.id_hex(),
            group_id: message.group_id.clone(),
            sender_address: message.sender_address.clone(),
            sent_at: timestamp_from_ns(message.sent_at_ns),
            sent_at_ns: message.sent_at_ns,
            delivery_status: message.delivery_status,
            fallback: encoded.fallback.clone(),
            encoded_content: encoded,
            content,
        })
    }

    pub fn decode_or_none(&self, message: &EngineMessage) -> Option<DecodedMessage> {
        match self.decode(message) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(message_id = %message.id_hex(), error = %e, "Skipping undecodable message");
                None
            }
        }
    }

    pub fn decrypt(&self, message: &EngineMessage) -> ClientResult<DecryptedMessage> {
        Ok(DecryptedMessage {
            id: message.id_hex(),
            group_id: message.group_id.clone(),
            sender_address: message.sender_address.clone(),
            sent_at: timestamp_from_ns(message.sent_at_ns),
            sent_at_ns: message.sent_at_ns,
            delivery_status: message.delivery_status,
            encoded_content: parse(message)?,
            raw: message.content.clone(),
        })
    }

    pub fn decrypt_or_none(&self, message: &EngineMessage) -> Option<DecryptedMessage> {
        match self.decrypt(message) {
            Ok(decrypted) => Some(decrypted),
            Err(e) => {
                warn!(message_id = %message.id_hex(), error = %e, "Skipping unparsable message");
                None
            }
        }
    }
}

fn parse(message: &EngineMessage) -> ClientResult<EncodedContent> {
    EncodedContent::from_bytes(&message.content).map_err(|e| transcode_error(message, e))
}

fn transcode_error(message: &EngineMessage, error: impl std::fmt::Display) -> ClientError {
    ClientError::Transcode(format!("message {}: {}", message.id_hex(), error))
}
