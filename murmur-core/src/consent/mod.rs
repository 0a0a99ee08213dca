//! Consent state for peers and groups
//!
//! Consent is persisted by a [`ConsentBackend`] and cached by the
//! [`ConsentStore`] a client shares across all of its groups. Addresses are
//! normalised before they are used as keys, so lookups are case-insensitive.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::engine::GroupId;

mod memory;
mod store;

pub use memory::MemoryConsentBackend;
pub use store::ConsentStore;

/// Result type for consent operations
pub type ConsentResult<T> = Result<T, ConsentError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsentError {
    /// The backing store could not be read or written
    #[error("Consent backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    Allowed,
    Denied,
    #[default]
    Unknown,
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsentState::Allowed => "allowed",
            ConsentState::Denied => "denied",
            ConsentState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What a consent decision applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentKey {
    Address(String),
    Group(GroupId),
}

impl ConsentKey {
    /// Key for a peer address, normalised
    pub fn address(address: &str) -> Self {
        ConsentKey::Address(normalize_address(address))
    }

    pub fn group(group_id: &GroupId) -> Self {
        ConsentKey::Group(group_id.clone())
    }
}

impl fmt::Display for ConsentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentKey::Address(address) => write!(f, "address:{}", address),
            ConsentKey::Group(group_id) => write!(f, "group:{}", group_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub key: ConsentKey,
    pub state: ConsentState,
}

/// Canonical form of an account address: trimmed and lower-cased
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Durable consent storage
#[async_trait]
pub trait ConsentBackend: Send + Sync {
    /// Stored state for `key`, or `None` if no decision was ever recorded
    async fn fetch(&self, key: &ConsentKey) -> ConsentResult<Option<ConsentState>>;

    /// Store all records, replacing earlier decisions for the same keys
    async fn persist(&self, records: &[ConsentRecord]) -> ConsentResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_key_normalised() {
        assert_eq!(ConsentKey::address("  0xABcd "), ConsentKey::address("0xabcd"));
        assert_eq!(ConsentKey::address("0xABcd").to_string(), "address:0xabcd");
    }

    #[test]
    fn test_state_default_unknown() {
        assert_eq!(ConsentState::default(), ConsentState::Unknown);
        assert_eq!(ConsentState::Denied.to_string(), "denied");
    }
}
