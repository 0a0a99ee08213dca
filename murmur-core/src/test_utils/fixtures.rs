//! Test fixtures for clients and groups

use std::sync::Arc;

use crate::client::Client;
use crate::codecs::{Content, ContentCodec, TextCodec};
use crate::config::ClientConfig;
use crate::consent::MemoryConsentBackend;
use crate::engine::{GroupPermissions, InMemoryEngine};
use crate::group::Group;

pub const ALICE: &str = "0xA11CEa11cea11cea11cea11cea11cea11cea11c";
pub const BOB: &str = "0xB0Bb0bb0bb0bb0bb0bb0bb0bb0bb0bb0bb0bb0b";
pub const CAROL: &str = "0xCA401ca401ca401ca401ca401ca401ca401ca40";

/// A client, its consent backend, an engine group and the group handle
pub struct TestGroup {
    pub client: Client,
    pub backend: Arc<MemoryConsentBackend>,
    pub engine: Arc<InMemoryEngine>,
    pub group: Group,
}

/// Builder for creating a [`TestGroup`]
pub struct TestGroupBuilder {
    address: String,
    creator: Option<String>,
    members: Vec<String>,
    policy: GroupPermissions,
    config: ClientConfig,
}

impl TestGroupBuilder {
    /// Group created by `address`, seen from `address`
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            creator: None,
            members: Vec::new(),
            policy: GroupPermissions::GroupCreatorIsAdmin,
            config: ClientConfig::default(),
        }
    }

    pub fn created_by(mut self, creator: &str) -> Self {
        self.creator = Some(creator.to_string());
        self
    }

    pub fn with_member(mut self, address: &str) -> Self {
        self.members.push(address.to_string());
        self
    }

    pub fn with_policy(mut self, policy: GroupPermissions) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TestGroup {
        let backend = Arc::new(MemoryConsentBackend::new());
        let client = Client::builder(self.address.as_str())
            .config(self.config)
            .consent_backend(backend.clone())
            .build()
            .expect("test client config is valid");

        let mut engine = InMemoryEngine::new(self.address.as_str())
            .with_members(self.members)
            .with_policy(self.policy);
        if let Some(creator) = self.creator {
            engine = engine.with_creator(creator);
        }
        let engine = Arc::new(engine);
        let group = client.group(engine.clone());

        TestGroup { client, backend, engine, group }
    }
}

/// Engine content bytes for a text message, as another member would send it
pub fn encoded_text(text: &str) -> Vec<u8> {
    TextCodec
        .encode(&Content::from(text))
        .and_then(|encoded| encoded.to_bytes())
        .expect("text always encodes")
}

/// Engine content bytes that no codec can decode
pub fn undecodable_content() -> Vec<u8> {
    vec![0xde, 0xad, 0xbe, 0xef]
}
