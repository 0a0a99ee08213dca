//! Group façade
//!
//! A [`Group`] composes a client's codecs and consent store with one
//! engine group: membership and metadata reads, consent-gated sends, history
//! queries and a live message stream.
//!
//! ```text
//! send:    Content ─► prepare_message ─► consent check ─► engine.send ─► hex id
//! history: filter ─► engine.find_messages (newest first) ─► lenient decode ─► direction
//! stream:  engine callback ─► producer task ─► lenient decode ─► MessageStream
//! ```

use chrono::{DateTime, Utc};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::codecs::{Content, EncodedContent};
use crate::consent::{normalize_address, ConsentState};
use crate::engine::{EngineMessage, GroupEngine, GroupId, GroupPermissions};
use crate::errors::ClientResult;
use crate::messages::{timestamp_from_ns, DecodedMessage, DecryptedMessage, MessageTranscoder};
use crate::metrics::{
    self, Timer, CODEC_ENCODE_DURATION, MESSAGES_LISTED, MESSAGES_SEND_FAILED, MESSAGES_SENT,
    MESSAGES_SKIPPED,
};

mod options;
mod stream;

pub use options::{MessageDeliveryStatus, MessageFilter, SendOptions, SortDirection};
pub use stream::MessageStream;

use stream::StreamHolder;

/// Handle to one group for one client
///
/// Cheap to clone; clones share the engine group and the live stream slot.
/// Equality and hashing use the group id only.
#[derive(Clone)]
pub struct Group {
    id: GroupId,
    engine: Arc<dyn GroupEngine>,
    client: Client,
    streams: StreamHolder,
}

impl Group {
    pub(crate) fn new(engine: Arc<dyn GroupEngine>, client: Client) -> Self {
        Self { id: engine.id(), engine, client, streams: StreamHolder::default() }
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        timestamp_from_ns(self.engine.created_at_ns())
    }

    /// Topic the group's messages are published on
    pub fn topic(&self) -> String {
        format!("/murmur/mls/1/g-{}/proto", self.id.to_hex())
    }

    pub async fn sync(&self) -> ClientResult<()> {
        debug!(group_id = %self.id, "Syncing group");
        Ok(self.engine.sync().await?)
    }

    pub fn is_active(&self) -> ClientResult<bool> {
        Ok(self.engine.is_active()?)
    }

    /// Whether this client created the group
    pub fn is_admin(&self) -> ClientResult<bool> {
        let creator = self.admin_address()?;
        Ok(normalize_address(&creator) == normalize_address(self.client.address()))
    }

    pub fn permission_level(&self) -> ClientResult<GroupPermissions> {
        Ok(self.engine.group_metadata()?.policy)
    }

    pub fn admin_address(&self) -> ClientResult<String> {
        Ok(self.engine.group_metadata()?.creator_account_address)
    }

    pub fn added_by_address(&self) -> ClientResult<String> {
        Ok(self.engine.added_by_address()?)
    }

    /// Member addresses as the engine reports them
    ///
    /// Returns an empty list if the engine cannot list members.
    pub fn member_addresses(&self) -> Vec<String> {
        match self.engine.list_members() {
            Ok(members) => members.into_iter().map(|m| m.account_address).collect(),
            Err(e) => {
                warn!(group_id = %self.id, error = %e, "Failed to list group members");
                Vec::new()
            }
        }
    }

    /// Lower-cased member addresses, excluding this client
    pub fn peer_addresses(&self) -> Vec<String> {
        let own = normalize_address(self.client.address());
        self.member_addresses()
            .iter()
            .map(|address| normalize_address(address))
            .filter(|address| *address != own)
            .collect()
    }

    pub async fn add_members<S: AsRef<str>>(&self, addresses: &[S]) -> ClientResult<()> {
        let addresses = owned(addresses);
        info!(group_id = %self.id, count = addresses.len(), "Adding members");
        Ok(self.engine.add_members(&addresses).await?)
    }

    pub async fn remove_members<S: AsRef<str>>(&self, addresses: &[S]) -> ClientResult<()> {
        let addresses = owned(addresses);
        info!(group_id = %self.id, count = addresses.len(), "Removing members");
        Ok(self.engine.remove_members(&addresses).await?)
    }

    pub fn group_name(&self) -> ClientResult<String> {
        Ok(self.engine.group_name()?)
    }

    pub async fn update_group_name(&self, name: &str) -> ClientResult<()> {
        Ok(self.engine.update_group_name(name).await?)
    }

    /// Decrypt and decode an envelope delivered outside the live stream
    pub async fn process_message(&self, envelope: &[u8]) -> ClientResult<DecodedMessage> {
        let message = self.engine.process_streamed_group_message(envelope).await?;
        self.transcoder().decode(&message)
    }

    pub async fn process_message_decrypted(&self, envelope: &[u8]) -> ClientResult<DecryptedMessage> {
        let message = self.engine.process_streamed_group_message(envelope).await?;
        self.transcoder().decrypt(&message)
    }

    /// Encode `content` and publish it, returning the hex message id
    pub async fn send(
        &self,
        content: impl Into<Content>,
        options: Option<SendOptions>,
    ) -> ClientResult<String> {
        let encoded = match self.prepare_message(&content.into(), options.as_ref()) {
            Ok(encoded) => encoded,
            Err(e) => {
                metrics::record_counter(MESSAGES_SEND_FAILED, 1);
                warn!(group_id = %self.id, error = %e, "Failed to encode message");
                return Err(e);
            }
        };
        self.send_encoded(&encoded).await
    }

    /// Publish already encoded content
    ///
    /// A group whose consent is still unknown is allowed first.
    pub async fn send_encoded(&self, encoded: &EncodedContent) -> ClientResult<String> {
        match self.publish(encoded).await {
            Ok(id) => {
                metrics::record_counter(MESSAGES_SENT, 1);
                info!(group_id = %self.id, message_id = %id, "Sent message");
                Ok(id)
            }
            Err(e) => {
                metrics::record_counter(MESSAGES_SEND_FAILED, 1);
                warn!(group_id = %self.id, error = %e, "Failed to send message");
                Err(e)
            }
        }
    }

    /// Encode `content` without sending it
    pub fn prepare_message(
        &self,
        content: &Content,
        options: Option<&SendOptions>,
    ) -> ClientResult<EncodedContent> {
        let timer = Timer::new(CODEC_ENCODE_DURATION);
        let codec = self.client.codecs().find(options.and_then(|o| o.content_type.as_ref()));
        let mut encoded = codec.encode(content)?;

        let fallback = match options.and_then(|o| o.content_fallback.as_ref()) {
            Some(fallback) => Some(fallback.clone()),
            None => codec.fallback(content)?,
        };
        if fallback.is_some() {
            encoded.fallback = fallback;
        }

        if let Some(compression) = options.and_then(|o| o.compression) {
            encoded = encoded.compress(compression)?;
        }
        timer.stop();
        Ok(encoded)
    }

    /// Decoded history; undecodable messages are skipped
    pub async fn messages(&self, filter: MessageFilter) -> ClientResult<Vec<DecodedMessage>> {
        let transcoder = self.transcoder();
        self.list(&filter, |message| transcoder.decode_or_none(message)).await
    }

    /// History as parsed envelopes; unparsable messages are skipped
    pub async fn decrypted_messages(&self, filter: MessageFilter) -> ClientResult<Vec<DecryptedMessage>> {
        let transcoder = self.transcoder();
        self.list(&filter, |message| transcoder.decrypt_or_none(message)).await
    }

    /// Open the live stream of decoded messages
    ///
    /// Messages this client sends arrive here too. Opening a stream while one
    /// is active closes the earlier one.
    pub async fn stream_messages(&self) -> ClientResult<MessageStream<DecodedMessage>> {
        let transcoder = self.transcoder().clone();
        self.open_stream(move |message| transcoder.decode_or_none(message)).await
    }

    pub async fn stream_decrypted_messages(&self) -> ClientResult<MessageStream<DecryptedMessage>> {
        let transcoder = self.transcoder().clone();
        self.open_stream(move |message| transcoder.decrypt_or_none(message)).await
    }

    /// Close the live stream, if any. The consumer sees the stream end.
    pub fn end_stream(&self) {
        if let Some(active) = self.streams.take() {
            active.close();
            info!(group_id = %self.id, "Ended message stream");
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streams.is_active()
    }

    fn transcoder(&self) -> &MessageTranscoder {
        self.client.transcoder()
    }

    async fn publish(&self, encoded: &EncodedContent) -> ClientResult<String> {
        let consent = self.client.consent();
        if consent.group_state(&self.id).await? == ConsentState::Unknown {
            debug!(group_id = %self.id, "Allowing group before first send");
            consent.allow_groups(&[self.id.clone()]).await?;
        }

        let bytes = encoded.to_bytes()?;
        let id = self.engine.send(&bytes).await?;
        Ok(hex::encode(id))
    }

    async fn list<T, F>(&self, filter: &MessageFilter, transcode: F) -> ClientResult<Vec<T>>
    where
        F: Fn(&EngineMessage) -> Option<T>,
    {
        let found = self.engine.find_messages(&filter.to_options()).await?;
        let total = found.len();

        let mut messages: Vec<T> = found.iter().filter_map(transcode).collect();
        let skipped = total - messages.len();
        if skipped > 0 {
            metrics::record_counter(MESSAGES_SKIPPED, skipped as u64);
        }
        metrics::record_counter(MESSAGES_LISTED, messages.len() as u64);

        // The engine answers newest first; limits apply before reordering
        if filter.direction == SortDirection::Ascending {
            messages.reverse();
        }
        debug!(group_id = %self.id, count = messages.len(), skipped, "Listed messages");
        Ok(messages)
    }

    async fn open_stream<T, F>(&self, transcode: F) -> ClientResult<MessageStream<T>>
    where
        T: Send + 'static,
        F: Fn(&EngineMessage) -> Option<T> + Send + 'static,
    {
        let capacity = self.client.config().stream.buffer_capacity;
        let (stream, active) =
            stream::open(&self.engine, self.streams.clone(), self.id.clone(), capacity, transcode)
                .await?;

        if let Some(previous) = self.streams.replace(active) {
            previous.close();
            info!(group_id = %self.id, "Closed previous message stream");
        }
        info!(group_id = %self.id, "Opened message stream");
        Ok(stream)
    }
}

fn owned<S: AsRef<str>>(addresses: &[S]) -> Vec<String> {
    addresses.iter().map(|a| a.as_ref().to_string()).collect()
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Group {}

impl Hash for Group {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("client", &self.client.address())
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{Compression, ContentTypeId, Reaction, ReactionAction, ReactionSchema};
    use crate::engine::{EngineError, EngineOp};
    use crate::errors::ClientError;
    use crate::consent::MemoryConsentBackend;
    use crate::engine::InMemoryEngine;
    use crate::test_utils::{TestGroupBuilder, ALICE, BOB, CAROL};

    #[test]
    fn test_identity_and_topic() {
        let fixture = TestGroupBuilder::new(ALICE).build();
        let group = &fixture.group;

        assert_eq!(group.id(), &fixture.engine.id());
        assert_eq!(group.topic(), format!("/murmur/mls/1/g-{}/proto", group.id().to_hex()));
        assert_eq!(group.clone(), *group);
        assert!(group.created_at() <= Utc::now());
    }

    #[test]
    fn test_admin_checks_ignore_case() {
        let own = TestGroupBuilder::new(ALICE).build();
        assert!(own.group.is_admin().unwrap());

        let lowered = TestGroupBuilder::new(&ALICE.to_lowercase()).created_by(ALICE).build();
        assert!(lowered.group.is_admin().unwrap());

        let theirs = TestGroupBuilder::new(ALICE).created_by(BOB).build();
        assert!(!theirs.group.is_admin().unwrap());
        assert_eq!(theirs.group.admin_address().unwrap(), BOB);
        assert_eq!(theirs.group.added_by_address().unwrap(), BOB);
    }

    #[test]
    fn test_permission_level() {
        let fixture = TestGroupBuilder::new(ALICE)
            .with_policy(GroupPermissions::EveryoneIsAdmin)
            .build();
        assert_eq!(fixture.group.permission_level().unwrap(), GroupPermissions::EveryoneIsAdmin);

        fixture.engine.fail(EngineOp::Metadata, EngineError::Unavailable("down".to_string()));
        assert!(matches!(fixture.group.permission_level(), Err(ClientError::Engine(_))));
    }

    #[test]
    fn test_peer_addresses_exclude_self() {
        let fixture = TestGroupBuilder::new(ALICE).with_member(BOB).with_member(CAROL).build();

        let peers = fixture.group.peer_addresses();
        assert_eq!(peers, vec![BOB.to_lowercase(), CAROL.to_lowercase()]);
        assert_eq!(fixture.group.member_addresses().len(), 3);
    }

    #[test]
    fn test_peer_addresses_exclude_self_across_casing() {
        let engine = Arc::new(InMemoryEngine::new(ALICE).with_members([BOB, CAROL]));

        for own in [ALICE.to_lowercase(), ALICE.to_uppercase()] {
            let client = Client::new(own.as_str(), Arc::new(MemoryConsentBackend::new()));
            let group = client.group(engine.clone());

            assert!(group.member_addresses().iter().any(|m| m == ALICE));
            assert_eq!(group.peer_addresses(), vec![BOB.to_lowercase(), CAROL.to_lowercase()]);
        }
    }

    #[test]
    fn test_member_addresses_lenient() {
        let fixture = TestGroupBuilder::new(ALICE).with_member(BOB).build();
        fixture.engine.fail(EngineOp::ListMembers, EngineError::Network("timeout".to_string()));

        assert!(fixture.group.member_addresses().is_empty());
        assert!(fixture.group.peer_addresses().is_empty());
    }

    #[test]
    fn test_prepare_message_uses_default_codec() {
        let fixture = TestGroupBuilder::new(ALICE).build();
        let encoded = fixture.group.prepare_message(&Content::from("hi"), None).unwrap();

        assert_eq!(encoded.content_type, ContentTypeId::text());
        assert_eq!(encoded.content, b"hi".to_vec());
        assert_eq!(encoded.fallback, None);
        assert!(fixture.engine.log().is_empty());
    }

    #[test]
    fn test_prepare_message_fallback_and_compression() {
        let fixture = TestGroupBuilder::new(ALICE).build();
        let reaction = Content::Reaction(Reaction {
            reference: "abcd".to_string(),
            action: ReactionAction::Added,
            schema: ReactionSchema::Unicode,
            content: "🎉".to_string(),
        });
        let options =
            SendOptions::content_type(ContentTypeId::reaction()).with_compression(Compression::Deflate);

        let encoded = fixture.group.prepare_message(&reaction, Some(&options)).unwrap();
        assert_eq!(encoded.compression, Some(Compression::Deflate));
        assert_eq!(encoded.fallback.as_deref(), Some("Reacted “🎉” to an earlier message"));

        let custom = options.with_fallback("party");
        let encoded = fixture.group.prepare_message(&reaction, Some(&custom)).unwrap();
        assert_eq!(encoded.fallback.as_deref(), Some("party"));
    }

    #[test]
    fn test_prepare_message_rejects_mismatched_content() {
        let fixture = TestGroupBuilder::new(ALICE).build();
        let options = SendOptions::content_type(ContentTypeId::reaction());

        let result = fixture.group.prepare_message(&Content::from("not a reaction"), Some(&options));
        assert!(matches!(result, Err(ClientError::Codec(_))));
    }

    #[tokio::test]
    async fn test_membership_and_name_pass_through() {
        let fixture = TestGroupBuilder::new(ALICE).build();
        let group = &fixture.group;

        group.add_members(&[BOB, CAROL]).await.unwrap();
        assert_eq!(group.peer_addresses().len(), 2);
        group.remove_members(&[CAROL]).await.unwrap();
        assert_eq!(group.peer_addresses(), vec![BOB.to_lowercase()]);

        group.update_group_name("weekend plans").await.unwrap();
        assert_eq!(group.group_name().unwrap(), "weekend plans");

        fixture.engine.fail(EngineOp::AddMembers, EngineError::InvalidAddress("0x0".to_string()));
        let err = group.add_members(&["0x0"]).await.unwrap_err();
        assert!(matches!(err, ClientError::Engine(EngineError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_sync_and_active() {
        let fixture = TestGroupBuilder::new(ALICE).build();
        fixture.group.sync().await.unwrap();
        assert_eq!(fixture.engine.sync_count(), 1);
        assert!(fixture.group.is_active().unwrap());

        fixture.engine.set_active(false);
        assert!(!fixture.group.is_active().unwrap());

        fixture.engine.fail(EngineOp::Sync, EngineError::Network("offline".to_string()));
        assert!(fixture.group.sync().await.is_err());
        assert_eq!(fixture.engine.sync_count(), 1);
    }
}
