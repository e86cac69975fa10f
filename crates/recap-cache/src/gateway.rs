//! Cache gateway.
//!
//! Two independent stores sit behind the gateway: one for content-source
//! sessions and one for media summaries and subject history. Reads that fail
//! are logged and reported as a miss; writes that fail are logged and
//! dropped. Nothing here ever fails a job.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use recap_models::CachedSummary;

use crate::config::{CacheBackend, CacheConfig};
use crate::error::CacheResult;
use crate::store::{KvStore, MemoryStore, RedisStore};

#[derive(Clone)]
pub struct CacheGateway {
    sessions: Arc<dyn KvStore>,
    summaries: Arc<dyn KvStore>,
}

impl CacheGateway {
    pub fn new(sessions: Arc<dyn KvStore>, summaries: Arc<dyn KvStore>) -> Self {
        Self {
            sessions,
            summaries,
        }
    }

    /// Build both stores from config.
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let gateway = match config.backend {
            CacheBackend::Redis => Self::new(
                Arc::new(RedisStore::new(&config.sessions_url)?),
                Arc::new(RedisStore::new(&config.history_url)?),
            ),
            CacheBackend::Memory => Self::in_memory(),
        };
        Ok(gateway)
    }

    /// Gateway over two fresh in-process stores.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    async fn read(store: &dyn KvStore, key: &str, what: &'static str) -> Option<String> {
        match store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, store = store.name(), "Failed to read {}: {}", what, e);
                None
            }
        }
    }

    async fn write(
        store: &dyn KvStore,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        what: &'static str,
    ) {
        if let Err(e) = store.set(key, value, ttl).await {
            warn!(key = %key, store = store.name(), "Failed to write {}: {}", what, e);
        }
    }

    /// Stored session blob for a login.
    pub async fn get_session(&self, login: &str) -> Option<String> {
        Self::read(self.sessions.as_ref(), login, "session").await
    }

    /// Store a session blob without expiry.
    pub async fn put_session(&self, login: &str, blob: &str) {
        Self::write(self.sessions.as_ref(), login, blob, None, "session").await
    }

    /// Cached summary for a media URL. Undecodable entries are a miss.
    pub async fn get_summary(&self, url: &str) -> Option<CachedSummary> {
        let raw = Self::read(self.summaries.as_ref(), url, "summary").await?;
        match serde_json::from_str(&raw) {
            Ok(summary) => {
                debug!(url = %url, "Summary cache hit");
                Some(summary)
            }
            Err(e) => {
                warn!(url = %url, "Discarding undecodable summary entry: {}", e);
                None
            }
        }
    }

    pub async fn put_summary(&self, url: &str, summary: &CachedSummary, ttl: Duration) {
        match serde_json::to_string(summary) {
            Ok(raw) => Self::write(self.summaries.as_ref(), url, &raw, Some(ttl), "summary").await,
            Err(e) => warn!(url = %url, "Failed to encode summary: {}", e),
        }
    }

    /// Raw persisted history for a subject.
    pub async fn get_history(&self, subject: &str) -> Option<String> {
        Self::read(self.summaries.as_ref(), subject, "history").await
    }

    pub async fn put_history(&self, subject: &str, raw: &str, ttl: Duration) {
        Self::write(self.summaries.as_ref(), subject, raw, Some(ttl), "history").await
    }

    pub async fn ping_sessions(&self) -> CacheResult<()> {
        self.sessions.ping().await
    }

    pub async fn ping_summaries(&self) -> CacheResult<()> {
        self.summaries.ping().await
    }
}
