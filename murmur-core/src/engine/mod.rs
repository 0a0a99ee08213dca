//! Group engine abstraction
//!
//! The engine owns the secure group protocol: membership, metadata,
//! encryption, publication and the live message feed. The client layer only
//! orchestrates on top of it.
//!
//! ```text
//! Group (client layer)
//!       |
//!       v
//! GroupEngine (trait)
//!       |
//!       +---> production MLS binding
//!       |
//!       +---> InMemoryEngine (tests, demos)
//! ```

use async_trait::async_trait;

mod error;
pub mod memory;
mod types;

pub use error::{EngineError, EngineResult};
pub use memory::{EngineOp, InMemoryEngine};
pub use types::{
    DeliveryStatus, EngineMessage, GroupId, GroupMember, GroupMetadata, GroupPermissions,
    ListMessagesOptions,
};

/// Receives messages from a live subscription
///
/// Called synchronously from the engine's delivery context, so
/// implementations must hand the message off without blocking.
pub trait MessageCallback: Send + Sync {
    fn on_message(&self, message: EngineMessage);
}

impl<F> MessageCallback for F
where
    F: Fn(EngineMessage) + Send + Sync,
{
    fn on_message(&self, message: EngineMessage) {
        self(message)
    }
}

/// Handle to an open live subscription
pub trait StreamCloser: Send + Sync {
    /// Close the subscription. Closing twice is a no-op.
    fn end(&self);

    fn is_closed(&self) -> bool;
}

/// Secure group operations for a single group
///
/// Metadata reads are synchronous; everything that may touch the network is
/// async. Implementations serialise operations on the same group internally.
#[async_trait]
pub trait GroupEngine: Send + Sync {
    fn id(&self) -> GroupId;

    /// Creation time in nanoseconds since the Unix epoch
    fn created_at_ns(&self) -> i64;

    fn group_metadata(&self) -> EngineResult<GroupMetadata>;

    fn is_active(&self) -> EngineResult<bool>;

    /// Address of the member who added this client to the group
    fn added_by_address(&self) -> EngineResult<String>;

    fn list_members(&self) -> EngineResult<Vec<GroupMember>>;

    fn group_name(&self) -> EngineResult<String>;

    async fn add_members(&self, addresses: &[String]) -> EngineResult<()>;

    async fn remove_members(&self, addresses: &[String]) -> EngineResult<()>;

    async fn update_group_name(&self, name: &str) -> EngineResult<()>;

    /// Pull and apply pending group state from the network
    async fn sync(&self) -> EngineResult<()>;

    /// Encrypt and publish `content_bytes`, returning the new message id
    async fn send(&self, content_bytes: &[u8]) -> EngineResult<Vec<u8>>;

    /// History query; results are always newest first
    async fn find_messages(&self, options: &ListMessagesOptions) -> EngineResult<Vec<EngineMessage>>;

    /// Decrypt an envelope delivered outside the live stream
    async fn process_streamed_group_message(&self, envelope: &[u8]) -> EngineResult<EngineMessage>;

    /// Open a live subscription delivering each new group message to `callback`
    async fn stream(&self, callback: Box<dyn MessageCallback>) -> EngineResult<Box<dyn StreamCloser>>;
}
