//! Data exchanged with the group engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque group identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub Vec<u8>);

impl GroupId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Generate a random 32-byte group ID
    pub fn random() -> Self {
        use rand::Rng;
        let mut bytes = vec![0u8; 32];
        rand::rng().fill(&mut bytes[..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s).map(Self::new)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Vec<u8>> for GroupId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for GroupId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Who may change membership and metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPermissions {
    EveryoneIsAdmin,
    GroupCreatorIsAdmin,
}

/// Metadata the engine keeps for a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub creator_account_address: String,
    pub policy: GroupPermissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub account_address: String,
    pub installation_ids: Vec<Vec<u8>>,
}

impl GroupMember {
    pub fn new(account_address: impl Into<String>) -> Self {
        Self { account_address: account_address.into(), installation_ids: Vec::new() }
    }
}

/// Publication state of a message as tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Unpublished,
    Published,
    Failed,
}

/// History query understood by [`GroupEngine::find_messages`](super::GroupEngine::find_messages)
///
/// Both bounds are exclusive. Results are newest first and `limit` keeps the
/// most recent entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMessagesOptions {
    pub sent_before_ns: Option<i64>,
    pub sent_after_ns: Option<i64>,
    pub limit: Option<i64>,
    pub delivery_status: Option<DeliveryStatus>,
}

impl ListMessagesOptions {
    /// True when both bounds are set and no timestamp can satisfy them
    pub fn is_empty_window(&self) -> bool {
        match (self.sent_after_ns, self.sent_before_ns) {
            (Some(after), Some(before)) => after.saturating_add(1) >= before,
            _ => false,
        }
    }

    /// Whether a message sent at `sent_at_ns` with `status` passes the filters
    pub fn matches(&self, sent_at_ns: i64, status: DeliveryStatus) -> bool {
        self.sent_before_ns.map_or(true, |before| sent_at_ns < before)
            && self.sent_after_ns.map_or(true, |after| sent_at_ns > after)
            && self.delivery_status.map_or(true, |wanted| wanted == status)
    }
}

/// A decrypted message as produced by the engine
///
/// `content` holds the serialised `EncodedContent` bytes the sender published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMessage {
    pub id: Vec<u8>,
    pub group_id: GroupId,
    pub sent_at_ns: i64,
    pub sender_address: String,
    pub content: Vec<u8>,
    pub delivery_status: DeliveryStatus,
}

impl EngineMessage {
    pub fn id_hex(&self) -> String {
        hex::encode(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_id_hex_roundtrip() {
        let group_id = GroupId::random();
        let parsed = GroupId::from_hex(&group_id.to_hex()).unwrap();
        assert_eq!(group_id, parsed);
        assert_eq!(GroupId::new(vec![1, 2, 3, 4]).to_string(), "01020304");
    }

    #[test]
    fn test_options_window_is_exclusive() {
        let opts = ListMessagesOptions {
            sent_after_ns: Some(10),
            sent_before_ns: Some(20),
            ..Default::default()
        };
        assert!(!opts.matches(10, DeliveryStatus::Published));
        assert!(opts.matches(11, DeliveryStatus::Published));
        assert!(opts.matches(19, DeliveryStatus::Published));
        assert!(!opts.matches(20, DeliveryStatus::Published));
    }

    #[test]
    fn test_options_empty_window() {
        let empty = ListMessagesOptions {
            sent_after_ns: Some(10),
            sent_before_ns: Some(11),
            ..Default::default()
        };
        assert!(empty.is_empty_window());
        assert!(!ListMessagesOptions::default().is_empty_window());
    }

    #[test]
    fn test_options_status_filter() {
        let opts = ListMessagesOptions {
            delivery_status: Some(DeliveryStatus::Failed),
            ..Default::default()
        };
        assert!(opts.matches(1, DeliveryStatus::Failed));
        assert!(!opts.matches(1, DeliveryStatus::Published));
    }
}
