//! Lazy per-session cache over a durable store.
//!
//! The first reference to a session populates the cache from the inner
//! store; every save writes through and refreshes the cached copy. The
//! store stays the only writer, so cache entries can never diverge within
//! one process.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ConversationStore, SessionRecord, SessionSummary, StoreError};

/// Write-through cache keyed by (user_id, session_id).
pub struct CachedStore {
    inner: Arc<dyn ConversationStore>,
    cache: DashMap<(String, String), SessionRecord>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn ConversationStore>) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl ConversationStore for CachedStore {
    async fn load(&self, user_id: &str, session_id: &str) -> Result<SessionRecord, StoreError> {
        let key = (user_id.to_string(), session_id.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }
        let record = self.inner.load(user_id, session_id).await?;
        self.cache.insert(key, record.clone());
        Ok(record)
    }

    async fn save(
        &self,
        user_id: &str,
        session_id: &str,
        record: &SessionRecord,
    ) -> Result<(), StoreError> {
        self.inner.save(user_id, session_id, record).await?;
        self.cache.insert(
            (user_id.to_string(), session_id.to_string()),
            record.clone(),
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.inner.delete(session_id).await?;
        self.cache.retain(|(_, sid), _| sid != session_id);
        Ok(())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError> {
        self.inner.list_sessions(user_id).await
    }
}
