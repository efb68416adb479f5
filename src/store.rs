use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::error::StoreError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Key-value store holding one window counter per client.
///
/// Each operation is assumed atomic on its own. Nothing makes a `get`
/// followed by a `put_with_expiry` atomic.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` and (re)start its expiry countdown at `ttl`.
    async fn put_with_expiry(&self, key: &str, value: &str, ttl: Duration)
    -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// Store key for a client identity
pub fn counter_key(identity: &str) -> String {
    format!("student:{}", identity)
}

// Open a store from "memory" or a redis:// url
pub async fn open(url: &str) -> Result<Arc<dyn CounterStore>, StoreError> {
    if url.eq_ignore_ascii_case("memory") {
        tracing::warn!("Using in-memory counter store, counts are per-process");
        return Ok(MemoryStore::with_sweeper(SWEEP_INTERVAL));
    }
    Ok(Arc::new(RedisStore::connect(url).await?))
}

// Counter entry with expiry timestamp
#[derive(Clone)]
struct CounterEntry {
    value: String,
    expires_at: Instant,
}

// In-memory store, expired entries are dropped when read or swept
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, CounterEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Store plus a background task that sweeps expired entries every `every`.
    // The task ends once the last Arc to the store is dropped.
    pub fn with_sweeper(every: Duration) -> Arc<Self> {
        let store = Arc::new(Self::new());
        tokio::spawn(sweeper(Arc::downgrade(&store), every));
        store
    }

    // Drop every expired entry, returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

async fn sweeper(store: Weak<MemoryStore>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        let Some(store) = store.upgrade() else {
            break;
        };
        let removed = store.sweep();
        if removed > 0 {
            tracing::debug!(removed, remaining = store.len(), "swept expired counters");
        }
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        Ok(None)
    }

    async fn put_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            CounterEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// Redis backed store, SET EX on every write
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Connection("connection timed out".to_string()))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(url = %url, "Connected to redis counter store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))
    }

    async fn put_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // redis rejects EX 0
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefixed() {
        assert_eq!(counter_key("stu1"), "student:stu1");
    }

    #[tokio::test]
    async fn memory_put_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store
            .put_with_expiry("k", "3", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("3"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        // deleting again is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn memory_entries_expire() {
        let store = MemoryStore::new();
        store
            .put_with_expiry("k", "1", Duration::from_millis(50))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_put_restarts_expiry() {
        let store = MemoryStore::new();
        store
            .put_with_expiry("k", "1", Duration::from_millis(300))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        store
            .put_with_expiry("k", "2", Duration::from_millis(300))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn sweep_drops_expired_entries() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store
                .put_with_expiry(&format!("k{}", i), "1", Duration::from_millis(1))
                .await
                .unwrap();
        }
        store
            .put_with_expiry("live", "1", Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.sweep(), 1000);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("live").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn background_sweeper_bounds_memory() {
        let store = MemoryStore::with_sweeper(Duration::from_millis(20));
        for i in 0..100 {
            store
                .put_with_expiry(&format!("k{}", i), "1", Duration::from_millis(1))
                .await
                .unwrap();
        }

        for _ in 0..50 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn open_memory_store() {
        let store = open("memory").await.unwrap();
        store
            .put_with_expiry("k", "1", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("1"));
    }

    // cargo test -- --ignored with REDIS_URL pointing at a scratch server
    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn redis_store_round_trip() {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let store = RedisStore::connect(&url).await.unwrap();

        store
            .put_with_expiry("student:redis-test", "1", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            store.get("student:redis-test").await.unwrap().as_deref(),
            Some("1")
        );
        store.delete("student:redis-test").await.unwrap();
        assert_eq!(store.get("student:redis-test").await.unwrap(), None);
    }
}
