//! In-process group engine
//!
//! Keeps one group's state in memory: members, metadata, an ordered message
//! log and live subscribers. Every operation can be made to fail through
//! [`InMemoryEngine::fail`], which is how the client layer's error paths are
//! exercised without a network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{
    DeliveryStatus, EngineError, EngineMessage, EngineResult, GroupEngine, GroupId, GroupMember,
    GroupMetadata, GroupPermissions, ListMessagesOptions, MessageCallback, StreamCloser,
};

/// Engine operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    Metadata,
    IsActive,
    AddedBy,
    ListMembers,
    GroupName,
    AddMembers,
    RemoveMembers,
    UpdateGroupName,
    Sync,
    Send,
    FindMessages,
    ProcessMessage,
    Stream,
}

#[derive(Debug)]
struct GroupState {
    metadata: GroupMetadata,
    added_by: String,
    active: bool,
    name: String,
    members: Vec<GroupMember>,
    /// Ascending by `sent_at_ns`
    log: Vec<EngineMessage>,
    syncs: usize,
}

struct Subscriber {
    closed: Arc<AtomicBool>,
    callback: Arc<dyn MessageCallback>,
}

struct Subscription {
    closed: Arc<AtomicBool>,
    closed_count: Arc<AtomicUsize>,
}

impl StreamCloser for Subscription {
    fn end(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.closed_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_ns() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// A single group held entirely in memory
pub struct InMemoryEngine {
    id: GroupId,
    account_address: String,
    created_at_ns: i64,
    last_timestamp_ns: AtomicI64,
    state: Mutex<GroupState>,
    subscribers: Mutex<Vec<Subscriber>>,
    failures: Mutex<HashMap<EngineOp, EngineError>>,
    closed_subscriptions: Arc<AtomicUsize>,
}

impl InMemoryEngine {
    /// New group created by `account_address`, who is its only member
    pub fn new(account_address: impl Into<String>) -> Self {
        let account_address = account_address.into();
        let created_at_ns = now_ns();
        Self {
            id: GroupId::random(),
            created_at_ns,
            last_timestamp_ns: AtomicI64::new(created_at_ns),
            state: Mutex::new(GroupState {
                metadata: GroupMetadata {
                    creator_account_address: account_address.clone(),
                    policy: GroupPermissions::GroupCreatorIsAdmin,
                },
                added_by: account_address.clone(),
                active: true,
                name: String::new(),
                members: vec![GroupMember::new(account_address.clone())],
                log: Vec::new(),
                syncs: 0,
            }),
            account_address,
            subscribers: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            closed_subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_group_id(mut self, id: GroupId) -> Self {
        self.id = id;
        self
    }

    /// Group created by someone else who added this account
    pub fn with_creator(self, creator: impl Into<String>) -> Self {
        let creator = creator.into();
        {
            let mut state = lock(&self.state);
            if !state.members.iter().any(|m| m.account_address.eq_ignore_ascii_case(&creator)) {
                state.members.insert(0, GroupMember::new(creator.clone()));
            }
            state.metadata.creator_account_address = creator.clone();
            state.added_by = creator;
        }
        self
    }

    pub fn with_members<I, S>(self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = lock(&self.state);
            for address in addresses {
                let address = address.into();
                if !state.members.iter().any(|m| m.account_address.eq_ignore_ascii_case(&address)) {
                    state.members.push(GroupMember::new(address));
                }
            }
        }
        self
    }

    pub fn with_policy(self, policy: GroupPermissions) -> Self {
        lock(&self.state).metadata.policy = policy;
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        lock(&self.state).name = name.into();
        self
    }

    pub fn account_address(&self) -> &str {
        &self.account_address
    }

    /// Make every call of `op` fail with `error` until cleared
    pub fn fail(&self, op: EngineOp, error: EngineError) {
        lock(&self.failures).insert(op, error);
    }

    pub fn clear_failure(&self, op: EngineOp) {
        lock(&self.failures).remove(&op);
    }

    pub fn set_active(&self, active: bool) {
        lock(&self.state).active = active;
    }

    /// A message from another member arrives now
    pub fn receive(&self, sender: &str, content: Vec<u8>) -> EngineMessage {
        let sent_at_ns = self.next_timestamp_ns();
        self.receive_at(sender, content, sent_at_ns)
    }

    /// A message from another member arrives with an explicit timestamp
    pub fn receive_at(&self, sender: &str, content: Vec<u8>, sent_at_ns: i64) -> EngineMessage {
        let message = self.message(sender, content, sent_at_ns, DeliveryStatus::Published);
        self.append(message.clone());
        self.notify(&message);
        message
    }

    /// Envelope bytes for a message that has not reached this engine yet
    pub fn seal(&self, sender: &str, content: Vec<u8>) -> EngineResult<Vec<u8>> {
        let message =
            self.message(sender, content, self.next_timestamp_ns(), DeliveryStatus::Published);
        Ok(bincode::serialize(&message)?)
    }

    /// The whole log, oldest first
    pub fn log(&self) -> Vec<EngineMessage> {
        lock(&self.state).log.clone()
    }

    pub fn sync_count(&self) -> usize {
        lock(&self.state).syncs
    }

    pub fn open_subscriptions(&self) -> usize {
        lock(&self.subscribers).iter().filter(|s| !s.closed.load(Ordering::SeqCst)).count()
    }

    pub fn closed_subscriptions(&self) -> usize {
        self.closed_subscriptions.load(Ordering::SeqCst)
    }

    fn check(&self, op: EngineOp) -> EngineResult<()> {
        match lock(&self.failures).get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Strictly increasing timestamps even when the clock does not advance
    fn next_timestamp_ns(&self) -> i64 {
        let now = now_ns();
        let previous = self
            .last_timestamp_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or(now);
        now.max(previous + 1)
    }

    fn message(
        &self,
        sender: &str,
        content: Vec<u8>,
        sent_at_ns: i64,
        delivery_status: DeliveryStatus,
    ) -> EngineMessage {
        EngineMessage {
            id: uuid::Uuid::new_v4().as_bytes().to_vec(),
            group_id: self.id.clone(),
            sent_at_ns,
            sender_address: sender.to_string(),
            content,
            delivery_status,
        }
    }

    fn append(&self, message: EngineMessage) {
        let mut state = lock(&self.state);
        let position = state.log.partition_point(|m| m.sent_at_ns <= message.sent_at_ns);
        state.log.insert(position, message);
    }

    fn notify(&self, message: &EngineMessage) {
        let callbacks: Vec<Arc<dyn MessageCallback>> = {
            let mut subscribers = lock(&self.subscribers);
            subscribers.retain(|s| !s.closed.load(Ordering::SeqCst));
            subscribers.iter().map(|s| Arc::clone(&s.callback)).collect()
        };
        for callback in callbacks {
            callback.on_message(message.clone());
        }
    }

    fn normalized(addresses: &[String]) -> EngineResult<Vec<String>> {
        addresses
            .iter()
            .map(|address| {
                let trimmed = address.trim();
                if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
                    Err(EngineError::InvalidAddress(address.clone()))
                } else {
                    Ok(trimmed.to_string())
                }
            })
            .collect()
    }
}

#[async_trait]
impl GroupEngine for InMemoryEngine {
    fn id(&self) -> GroupId {
        self.id.clone()
    }

    fn created_at_ns(&self) -> i64 {
        self.created_at_ns
    }

    fn group_metadata(&self) -> EngineResult<GroupMetadata> {
        self.check(EngineOp::Metadata)?;
        Ok(lock(&self.state).metadata.clone())
    }

    fn is_active(&self) -> EngineResult<bool> {
        self.check(EngineOp::IsActive)?;
        Ok(lock(&self.state).active)
    }

    fn added_by_address(&self) -> EngineResult<String> {
        self.check(EngineOp::AddedBy)?;
        Ok(lock(&self.state).added_by.clone())
    }

    fn list_members(&self) -> EngineResult<Vec<GroupMember>> {
        self.check(EngineOp::ListMembers)?;
        Ok(lock(&self.state).members.clone())
    }

    fn group_name(&self) -> EngineResult<String> {
        self.check(EngineOp::GroupName)?;
        Ok(lock(&self.state).name.clone())
    }

    async fn add_members(&self, addresses: &[String]) -> EngineResult<()> {
        self.check(EngineOp::AddMembers)?;
        let addresses = Self::normalized(addresses)?;
        let mut state = lock(&self.state);
        for address in addresses {
            if !state.members.iter().any(|m| m.account_address.eq_ignore_ascii_case(&address)) {
                debug!(group_id = %self.id, member = %address, "Adding member");
                state.members.push(GroupMember::new(address));
            }
        }
        Ok(())
    }

    async fn remove_members(&self, addresses: &[String]) -> EngineResult<()> {
        self.check(EngineOp::RemoveMembers)?;
        let addresses = Self::normalized(addresses)?;
        let mut state = lock(&self.state);
        if let Some(missing) = addresses
            .iter()
            .find(|a| !state.members.iter().any(|m| m.account_address.eq_ignore_ascii_case(a)))
        {
            return Err(EngineError::NotFound(format!("member {}", missing)));
        }
        state
            .members
            .retain(|m| !addresses.iter().any(|a| m.account_address.eq_ignore_ascii_case(a)));
        Ok(())
    }

    async fn update_group_name(&self, name: &str) -> EngineResult<()> {
        self.check(EngineOp::UpdateGroupName)?;
        lock(&self.state).name = name.to_string();
        Ok(())
    }

    async fn sync(&self) -> EngineResult<()> {
        self.check(EngineOp::Sync)?;
        lock(&self.state).syncs += 1;
        Ok(())
    }

    async fn send(&self, content_bytes: &[u8]) -> EngineResult<Vec<u8>> {
        self.check(EngineOp::Send)?;
        let message = self.message(
            &self.account_address,
            content_bytes.to_vec(),
            self.next_timestamp_ns(),
            DeliveryStatus::Published,
        );
        let id = message.id.clone();
        debug!(group_id = %self.id, message_id = %message.id_hex(), "Published message");
        self.append(message.clone());
        self.notify(&message);
        Ok(id)
    }

    async fn find_messages(&self, options: &ListMessagesOptions) -> EngineResult<Vec<EngineMessage>> {
        self.check(EngineOp::FindMessages)?;
        if options.is_empty_window() {
            return Ok(Vec::new());
        }
        let state = lock(&self.state);
        let matching = state
            .log
            .iter()
            .rev()
            .filter(|m| options.matches(m.sent_at_ns, m.delivery_status))
            .cloned();
        Ok(match options.limit {
            Some(limit) => matching.take(usize::try_from(limit).unwrap_or(0)).collect(),
            None => matching.collect(),
        })
    }

    async fn process_streamed_group_message(&self, envelope: &[u8]) -> EngineResult<EngineMessage> {
        self.check(EngineOp::ProcessMessage)?;
        let message: EngineMessage = bincode::deserialize(envelope)?;
        if message.group_id != self.id {
            return Err(EngineError::Protocol(format!(
                "envelope for group {} delivered to group {}",
                message.group_id, self.id
            )));
        }
        let known = lock(&self.state).log.iter().any(|m| m.id == message.id);
        if !known {
            self.append(message.clone());
        }
        Ok(message)
    }

    async fn stream(&self, callback: Box<dyn MessageCallback>) -> EngineResult<Box<dyn StreamCloser>> {
        self.check(EngineOp::Stream)?;
        let closed = Arc::new(AtomicBool::new(false));
        lock(&self.subscribers)
            .push(Subscriber { closed: Arc::clone(&closed), callback: Arc::from(callback) });
        debug!(group_id = %self.id, "Opened subscription");
        Ok(Box::new(Subscription { closed, closed_count: Arc::clone(&self.closed_subscriptions) }))
    }
}
