//! Content type identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::CodecError;

/// Authority used by the built-in codecs
pub const BUILTIN_AUTHORITY: &str = "murmur.org";

/// Identifies a content type as `authority/type:major.minor`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentTypeId {
    pub authority_id: String,
    pub type_id: String,
    pub version_major: u32,
    pub version_minor: u32,
}

impl ContentTypeId {
    pub fn new(
        authority_id: impl Into<String>,
        type_id: impl Into<String>,
        version_major: u32,
        version_minor: u32,
    ) -> Self {
        Self {
            authority_id: authority_id.into(),
            type_id: type_id.into(),
            version_major,
            version_minor,
        }
    }

    pub fn text() -> Self {
        Self::new(BUILTIN_AUTHORITY, "text", 1, 0)
    }

    pub fn reaction() -> Self {
        Self::new(BUILTIN_AUTHORITY, "reaction", 1, 0)
    }

    pub fn passthrough() -> Self {
        Self::new(BUILTIN_AUTHORITY, "passthrough", 1, 0)
    }

    /// Registry key: `authority/type`, ignoring the version
    pub fn id(&self) -> String {
        format!("{}/{}", self.authority_id, self.type_id)
    }

    /// Whether `other` names the same type, regardless of version
    pub fn same_as(&self, other: &ContentTypeId) -> bool {
        self.authority_id == other.authority_id && self.type_id == other.type_id
    }
}

impl fmt::Display for ContentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}.{}",
            self.authority_id, self.type_id, self.version_major, self.version_minor
        )
    }
}

impl FromStr for ContentTypeId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidContentType(s.to_string());

        let (authority, rest) = s.split_once('/').ok_or_else(invalid)?;
        let (type_id, version) = match rest.split_once(':') {
            Some((type_id, version)) => (type_id, Some(version)),
            None => (rest, None),
        };
        if authority.is_empty() || type_id.is_empty() {
            return Err(invalid());
        }

        let (major, minor) = match version {
            None => (1, 0),
            Some(version) => {
                let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
                (
                    major.parse().map_err(|_| invalid())?,
                    minor.parse().map_err(|_| invalid())?,
                )
            }
        };

        Ok(Self::new(authority, type_id, major, minor))
    }
}
