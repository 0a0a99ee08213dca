//! Codec registry keyed by content type

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use super::{
    CodecError, CodecResult, ContentCodec, ContentTypeId, PassthroughCodec, ReactionCodec,
    TextCodec,
};

/// Resolves content types to codecs
///
/// Lookups never fail: a send without a content type gets the default codec
/// and an unregistered type gets the [`PassthroughCodec`].
pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn ContentCodec>>>,
    default_type: ContentTypeId,
    passthrough: Arc<dyn ContentCodec>,
}

impl CodecRegistry {
    /// Registry with the built-in text and reaction codecs; text is the default
    pub fn new() -> Self {
        let registry = Self {
            codecs: RwLock::new(HashMap::new()),
            default_type: ContentTypeId::text(),
            passthrough: Arc::new(PassthroughCodec),
        };
        registry.register(Arc::new(TextCodec));
        registry.register(Arc::new(ReactionCodec));
        registry
    }

    /// Built-in registry with a different default content type
    ///
    /// The default must name a registered codec.
    pub fn with_default(default_type: ContentTypeId) -> CodecResult<Self> {
        let mut registry = Self::new();
        if !registry.is_registered(&default_type) {
            return Err(CodecError::InvalidContentType(format!(
                "no codec registered for default content type {}",
                default_type
            )));
        }
        registry.default_type = default_type;
        Ok(registry)
    }

    /// Add a codec, replacing any codec registered for the same type
    pub fn register(&self, codec: Arc<dyn ContentCodec>) {
        let content_type = codec.content_type();
        debug!(content_type = %content_type, "Registering codec");
        self.codecs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content_type.id(), codec);
    }

    pub fn is_registered(&self, content_type: &ContentTypeId) -> bool {
        self.codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&content_type.id())
    }

    pub fn default_content_type(&self) -> &ContentTypeId {
        &self.default_type
    }

    /// Codec for `content_type`, or the default codec when `None`
    pub fn find(&self, content_type: Option<&ContentTypeId>) -> Arc<dyn ContentCodec> {
        let content_type = content_type.unwrap_or(&self.default_type);
        match self
            .codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&content_type.id())
        {
            Some(codec) => Arc::clone(codec),
            None => {
                debug!(content_type = %content_type, "No codec registered, using passthrough");
                Arc::clone(&self.passthrough)
            }
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<String> = self
            .codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        registered.sort();
        f.debug_struct("CodecRegistry")
            .field("registered", &registered)
            .field("default_type", &self.default_type)
            .finish()
    }
}
