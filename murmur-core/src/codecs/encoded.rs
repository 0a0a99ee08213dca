//! Encoded content envelope
//!
//! The codec-neutral representation handed to the engine. Serialised with
//! bincode; the payload may be compressed after encoding.

use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::content_type::ContentTypeId;
use super::error::{CodecError, CodecResult};

/// Upper bound on a decompressed payload unless configured otherwise (16 MiB)
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// Compression applied to an encoded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Deflate,
    Gzip,
}

impl Compression {
    fn compress(self, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        self.compress_io(bytes)
            .map_err(|e| CodecError::Compression(format!("{:?}: {}", self, e)))
    }

    fn compress_io(self, bytes: &[u8]) -> std::io::Result<Vec<u8>> {
        let level = flate2::Compression::default();
        match self {
            Compression::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), level);
                encoder.write_all(bytes)?;
                encoder.finish()
            }
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(bytes)?;
                encoder.finish()
            }
        }
    }

    /// Inflate at most `limit` bytes; larger payloads are rejected
    fn decompress(self, bytes: &[u8], limit: usize) -> CodecResult<Vec<u8>> {
        let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
        let mut out = Vec::new();
        let result = match self {
            Compression::Deflate => DeflateDecoder::new(bytes).take(cap).read_to_end(&mut out),
            Compression::Gzip => GzDecoder::new(bytes).take(cap).read_to_end(&mut out),
        };
        result.map_err(|e| CodecError::Compression(format!("{:?}: {}", self, e)))?;

        if out.len() > limit {
            return Err(CodecError::Compression(format!(
                "{:?}: decompressed payload exceeds {} bytes",
                self, limit
            )));
        }
        Ok(out)
    }
}

/// Content type, parameters, optional fallback text and the (possibly compressed) payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedContent {
    pub content_type: ContentTypeId,
    pub parameters: BTreeMap<String, String>,
    /// Human-readable stand-in for clients without the codec
    pub fallback: Option<String>,
    pub compression: Option<Compression>,
    pub content: Vec<u8>,
}

impl EncodedContent {
    pub fn new(content_type: ContentTypeId, content: Vec<u8>) -> Self {
        Self {
            content_type,
            parameters: BTreeMap::new(),
            fallback: None,
            compression: None,
            content,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Compress the payload. Fails if it is already compressed.
    pub fn compress(mut self, compression: Compression) -> CodecResult<Self> {
        if let Some(existing) = self.compression {
            return Err(CodecError::Compression(format!(
                "content is already compressed with {:?}",
                existing
            )));
        }
        self.content = compression.compress(&self.content)?;
        self.compression = Some(compression);
        Ok(self)
    }

    /// Undo any compression; a no-op for uncompressed content
    pub fn decompress(self) -> CodecResult<Self> {
        self.decompress_with_limit(DEFAULT_MAX_DECOMPRESSED_SIZE)
    }

    /// Undo any compression, failing if the payload inflates past `limit` bytes
    pub fn decompress_with_limit(mut self, limit: usize) -> CodecResult<Self> {
        if let Some(compression) = self.compression.take() {
            self.content = compression.decompress(&self.content, limit)?;
        }
        Ok(self)
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CodecError::Encoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
