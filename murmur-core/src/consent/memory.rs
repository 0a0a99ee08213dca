//! In-memory consent backend

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{ConsentBackend, ConsentError, ConsentKey, ConsentRecord, ConsentResult, ConsentState};

/// Consent records held in a map, with counters for observing cache behaviour
#[derive(Debug, Default)]
pub struct MemoryConsentBackend {
    records: Mutex<HashMap<ConsentKey, ConsentState>>,
    queries: AtomicUsize,
    writes: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_persist: AtomicBool,
}

impl MemoryConsentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `records`
    pub fn with_records(records: impl IntoIterator<Item = ConsentRecord>) -> Self {
        let backend = Self::new();
        backend
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records.into_iter().map(|r| (r.key, r.state)));
        backend
    }

    /// Number of `fetch` calls served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of `persist` calls served so far
    pub fn persist_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored state without counting as a query
    pub fn stored(&self, key: &ConsentKey) -> Option<ConsentState> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).get(key).copied()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConsentBackend for MemoryConsentBackend {
    async fn fetch(&self, key: &ConsentKey) -> ConsentResult<Option<ConsentState>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ConsentError::Backend(format!("fetch {} failed", key)));
        }
        Ok(self.stored(key))
    }

    async fn persist(&self, records: &[ConsentRecord]) -> ConsentResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(ConsentError::Backend(format!("persist of {} records failed", records.len())));
        }
        let mut stored = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            stored.insert(record.key.clone(), record.state);
        }
        Ok(())
    }
}
