//! Client-side message representations
//!
//! Engine messages carry serialised [`EncodedContent`]. The
//! [`MessageTranscoder`] turns them into [`DecodedMessage`]s (content decoded
//! through the codec registry) or [`DecryptedMessage`]s (envelope parsed, no
//! codec involved).

use chrono::{DateTime, TimeZone, Utc};

use crate::codecs::{Content, EncodedContent};
use crate::engine::{DeliveryStatus, GroupId};

mod transcoder;

pub use transcoder::MessageTranscoder;

/// A message with its content decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// Hex-encoded message id
    pub id: String,
    pub group_id: GroupId,
    pub sender_address: String,
    pub sent_at: DateTime<Utc>,
    pub sent_at_ns: i64,
    pub delivery_status: DeliveryStatus,
    /// Envelope after decompression
    pub encoded_content: EncodedContent,
    pub content: Content,
    pub fallback: Option<String>,
}

impl DecodedMessage {
    /// Text body, if this is a text message
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}

/// A message parsed into its envelope without decoding the content
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedMessage {
    pub id: String,
    pub group_id: GroupId,
    pub sender_address: String,
    pub sent_at: DateTime<Utc>,
    pub sent_at_ns: i64,
    pub delivery_status: DeliveryStatus,
    pub encoded_content: EncodedContent,
    /// Decrypted bytes exactly as the engine produced them
    pub raw: Vec<u8>,
}

pub(crate) fn timestamp_from_ns(ns: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(ns)
}
