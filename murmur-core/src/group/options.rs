//! Send and history query options

use chrono::{DateTime, Utc};

use crate::codecs::{Compression, ContentTypeId};
use crate::engine::{DeliveryStatus, ListMessagesOptions};

/// Per-send encoding choices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Codec to encode with; `None` uses the registry default
    pub content_type: Option<ContentTypeId>,
    pub compression: Option<Compression>,
    /// Replaces the codec's own fallback text
    pub content_fallback: Option<String>,
}

impl SendOptions {
    pub fn content_type(content_type: ContentTypeId) -> Self {
        Self { content_type: Some(content_type), ..Default::default() }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.content_fallback = Some(fallback.into());
        self
    }
}

/// Order of returned history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Delivery status filter for history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageDeliveryStatus {
    #[default]
    All,
    Published,
    Unpublished,
    Failed,
}

impl MessageDeliveryStatus {
    fn engine_status(self) -> Option<DeliveryStatus> {
        match self {
            MessageDeliveryStatus::All => None,
            MessageDeliveryStatus::Published => Some(DeliveryStatus::Published),
            MessageDeliveryStatus::Unpublished => Some(DeliveryStatus::Unpublished),
            MessageDeliveryStatus::Failed => Some(DeliveryStatus::Failed),
        }
    }
}

/// History query for [`Group::messages`](super::Group::messages)
///
/// `before` and `after` are exclusive. `limit` always keeps the most recent
/// messages, whatever the direction: an ascending query with `limit(n)`
/// returns the newest `n` messages oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub direction: SortDirection,
    pub delivery_status: MessageDeliveryStatus,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn delivery_status(mut self, status: MessageDeliveryStatus) -> Self {
        self.delivery_status = status;
        self
    }

    pub(crate) fn to_options(&self) -> ListMessagesOptions {
        // Dates outside the representable nanosecond range clamp to the ends
        ListMessagesOptions {
            sent_before_ns: self.before.map(|t| t.timestamp_nanos_opt().unwrap_or(i64::MAX)),
            sent_after_ns: self.after.map(|t| t.timestamp_nanos_opt().unwrap_or(i64::MIN)),
            limit: self.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)),
            delivery_status: self.delivery_status.engine_status(),
        }
    }
}
