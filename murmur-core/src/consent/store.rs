//! Cached consent lookups

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::{ConsentBackend, ConsentKey, ConsentRecord, ConsentResult, ConsentState};
use crate::engine::GroupId;
use crate::metrics::{self, CONSENT_CACHE_HITS, CONSENT_CACHE_MISSES};

/// Consent decisions for one client
///
/// Every resolved lookup is cached, including `Unknown`, so a key is fetched
/// from the backend at most once until it is invalidated. Writes persist
/// first and then update only the keys they touched. Writes are serialised,
/// so the last write to a key wins in both the backend and the cache.
pub struct ConsentStore {
    backend: Arc<dyn ConsentBackend>,
    cache: RwLock<HashMap<ConsentKey, ConsentState>>,
    /// Held across persist and cache update
    writes: Mutex<()>,
}

impl ConsentStore {
    pub fn new(backend: Arc<dyn ConsentBackend>) -> Self {
        Self { backend, cache: RwLock::new(HashMap::new()), writes: Mutex::new(()) }
    }

    pub async fn group_state(&self, group_id: &GroupId) -> ConsentResult<ConsentState> {
        self.lookup(ConsentKey::group(group_id)).await
    }

    pub async fn state(&self, address: &str) -> ConsentResult<ConsentState> {
        self.lookup(ConsentKey::address(address)).await
    }

    pub async fn allow_groups(&self, group_ids: &[GroupId]) -> ConsentResult<()> {
        self.set(group_ids.iter().map(ConsentKey::group), ConsentState::Allowed).await
    }

    pub async fn deny_groups(&self, group_ids: &[GroupId]) -> ConsentResult<()> {
        self.set(group_ids.iter().map(ConsentKey::group), ConsentState::Denied).await
    }

    pub async fn allow<S: AsRef<str>>(&self, addresses: &[S]) -> ConsentResult<()> {
        self.set(addresses.iter().map(|a| ConsentKey::address(a.as_ref())), ConsentState::Allowed)
            .await
    }

    pub async fn deny<S: AsRef<str>>(&self, addresses: &[S]) -> ConsentResult<()> {
        self.set(addresses.iter().map(|a| ConsentKey::address(a.as_ref())), ConsentState::Denied)
            .await
    }

    pub async fn is_allowed(&self, address: &str) -> ConsentResult<bool> {
        Ok(self.state(address).await? == ConsentState::Allowed)
    }

    pub async fn is_denied(&self, address: &str) -> ConsentResult<bool> {
        Ok(self.state(address).await? == ConsentState::Denied)
    }

    pub async fn is_group_allowed(&self, group_id: &GroupId) -> ConsentResult<bool> {
        Ok(self.group_state(group_id).await? == ConsentState::Allowed)
    }

    pub async fn is_group_denied(&self, group_id: &GroupId) -> ConsentResult<bool> {
        Ok(self.group_state(group_id).await? == ConsentState::Denied)
    }

    /// Drop a cached entry so the next lookup re-queries the backend
    pub async fn invalidate(&self, key: &ConsentKey) {
        if self.cache.write().await.remove(key).is_some() {
            debug!(key = %key, "Invalidated consent entry");
        }
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        debug!(entries = cache.len(), "Clearing consent cache");
        cache.clear();
    }

    async fn lookup(&self, key: ConsentKey) -> ConsentResult<ConsentState> {
        if let Some(state) = self.cache.read().await.get(&key).copied() {
            metrics::record_counter(CONSENT_CACHE_HITS, 1);
            return Ok(state);
        }

        metrics::record_counter(CONSENT_CACHE_MISSES, 1);
        let fetched = self.backend.fetch(&key).await?.unwrap_or_default();
        debug!(key = %key, state = %fetched, "Fetched consent state");

        // A write that landed while fetching wins over the fetched value
        let mut cache = self.cache.write().await;
        Ok(*cache.entry(key).or_insert(fetched))
    }

    async fn set(
        &self,
        keys: impl Iterator<Item = ConsentKey>,
        state: ConsentState,
    ) -> ConsentResult<()> {
        let mut records: Vec<ConsentRecord> = Vec::new();
        for key in keys {
            if !records.iter().any(|r| r.key == key) {
                records.push(ConsentRecord { key, state });
            }
        }
        if records.is_empty() {
            return Ok(());
        }

        let _write = self.writes.lock().await;
        self.backend.persist(&records).await?;

        let mut cache = self.cache.write().await;
        for record in &records {
            cache.insert(record.key.clone(), state);
        }
        info!(count = records.len(), state = %state, "Updated consent");
        Ok(())
    }
}

impl std::fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentStore").finish_non_exhaustive()
    }
}
