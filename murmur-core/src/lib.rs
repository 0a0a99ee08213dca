//! Client-side group messaging over a secure group engine
//!
//! A [`Client`] owns the codec registry and consent store; each [`Group`]
//! it hands out prepares, sends, lists and streams messages for one engine
//! group.

pub mod client;
pub mod codecs;
pub mod config;
pub mod consent;
pub mod engine;
pub mod errors;
pub mod group;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod test_utils;

pub use client::{Client, ClientBuilder};
pub use codecs::{CodecRegistry, Compression, Content, ContentCodec, ContentTypeId, EncodedContent};
pub use config::ClientConfig;
pub use consent::{ConsentBackend, ConsentState, ConsentStore, MemoryConsentBackend};
pub use engine::{GroupEngine, GroupId, InMemoryEngine};
pub use errors::{ClientError, ClientResult};
pub use group::{Group, MessageDeliveryStatus, MessageFilter, MessageStream, SendOptions, SortDirection};
pub use logging::{init_logging, LogLevel};
pub use messages::{DecodedMessage, DecryptedMessage};
