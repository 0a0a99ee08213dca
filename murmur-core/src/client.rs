//! Client owning the shared codec registry and consent store

use std::sync::Arc;
use tracing::info;

use crate::codecs::CodecRegistry;
use crate::config::{ClientConfig, ConfigError};
use crate::consent::{ConsentBackend, ConsentStore, MemoryConsentBackend};
use crate::engine::GroupEngine;
use crate::errors::ClientResult;
use crate::group::Group;
use crate::messages::MessageTranscoder;

struct ClientInner {
    address: String,
    config: ClientConfig,
    codecs: Arc<CodecRegistry>,
    consent: Arc<ConsentStore>,
    transcoder: MessageTranscoder,
}

/// One account's view of its groups
///
/// Cheap to clone. Every [`Group`] obtained from a client shares its codec
/// registry and consent cache.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Client with default configuration and the built-in codecs
    pub fn new(address: impl Into<String>, consent_backend: Arc<dyn ConsentBackend>) -> Self {
        let codecs = Arc::new(CodecRegistry::new());
        Self::from_parts(address.into(), ClientConfig::default(), codecs, consent_backend)
    }

    pub fn builder(address: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            address: address.into(),
            config: ClientConfig::default(),
            consent_backend: None,
            codecs: None,
        }
    }

    fn from_parts(
        address: String,
        config: ClientConfig,
        codecs: Arc<CodecRegistry>,
        consent_backend: Arc<dyn ConsentBackend>,
    ) -> Self {
        let transcoder = MessageTranscoder::new(Arc::clone(&codecs))
            .with_max_decompressed_bytes(config.codecs.max_decompressed_bytes);
        Self {
            inner: Arc::new(ClientInner {
                address,
                config,
                transcoder,
                codecs,
                consent: Arc::new(ConsentStore::new(consent_backend)),
            }),
        }
    }

    /// This account's address as configured
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.inner.codecs
    }

    pub fn consent(&self) -> &Arc<ConsentStore> {
        &self.inner.consent
    }

    pub fn transcoder(&self) -> &MessageTranscoder {
        &self.inner.transcoder
    }

    /// Wrap an engine group for this client
    pub fn group(&self, engine: Arc<dyn GroupEngine>) -> Group {
        Group::new(engine, self.clone())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.inner.address)
            .field("codecs", &self.inner.codecs)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Client`] with non-default parts
pub struct ClientBuilder {
    address: String,
    config: ClientConfig,
    consent_backend: Option<Arc<dyn ConsentBackend>>,
    codecs: Option<CodecRegistry>,
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn consent_backend(mut self, backend: Arc<dyn ConsentBackend>) -> Self {
        self.consent_backend = Some(backend);
        self
    }

    /// Use `codecs` instead of a registry built from the configuration
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Some(codecs);
        self
    }

    /// Validate the configuration and build the client
    ///
    /// Without a consent backend, decisions are kept in memory only.
    pub fn build(self) -> ClientResult<Client> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::InvalidValue("client address must not be empty".to_string()).into());
        }
        self.config.validate()?;

        let codecs = match self.codecs {
            Some(codecs) => codecs,
            None => CodecRegistry::with_default(self.config.codecs.default_content_type()?)?,
        };
        let consent_backend: Arc<dyn ConsentBackend> = match self.consent_backend {
            Some(backend) => backend,
            None => Arc::new(MemoryConsentBackend::new()),
        };

        info!(
            address = %self.address,
            default_content_type = %codecs.default_content_type(),
            "Client ready"
        );
        Ok(Client::from_parts(self.address, self.config, Arc::new(codecs), consent_backend))
    }
}
