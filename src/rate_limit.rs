use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::{CounterStore, counter_key};

// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub count: u64,
    pub blocked: bool,
}

/// Fixed window counter backed by the shared store.
///
/// Every hit rewrites the counter with a full `window` of expiry, so a
/// client that keeps sending requests keeps its window open. The
/// read-then-write is not atomic: concurrent hits from one client may
/// both read the same count.
#[derive(Clone)]
pub struct WindowLimiter {
    store: Arc<dyn CounterStore>,
    limit: u64,
    window: Duration,
}

impl WindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    // Count a request for this identity, store failures fail open
    pub async fn hit(&self, identity: &str) -> WindowHit {
        let key = counter_key(identity);

        let prev = match self.store.get(&key).await {
            Ok(value) => parse_count(value.as_deref()),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "counter read failed, treating as 0");
                0
            }
        };
        let count = prev.saturating_add(1);

        if let Err(e) = self
            .store
            .put_with_expiry(&key, &count.to_string(), self.window)
            .await
        {
            tracing::warn!(key = %key, error = %e, "counter write failed");
        }

        WindowHit {
            count,
            blocked: count > self.limit,
        }
    }

    // Best effort re-read for the diagnostic header
    pub async fn current(&self, identity: &str) -> u64 {
        match self.store.get(&counter_key(identity)).await {
            Ok(value) => parse_count(value.as_deref()),
            Err(_) => 0,
        }
    }

    // Drop the counter so the next request starts a fresh window
    pub async fn reset(&self, identity: &str) -> Result<(), StoreError> {
        self.store.delete(&counter_key(identity)).await
    }
}

// Missing or garbage values count as zero
fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    fn limiter() -> WindowLimiter {
        WindowLimiter::new(Arc::new(MemoryStore::new()), 2, Duration::from_secs(60))
    }

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Operation("down".into()))
        }

        async fn put_with_expiry(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), StoreError> {
            Err(StoreError::Operation("down".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Operation("down".into()))
        }
    }

    #[tokio::test]
    async fn third_hit_is_blocked() {
        let limiter = limiter();
        assert_eq!(limiter.hit("stu1").await, WindowHit { count: 1, blocked: false });
        assert_eq!(limiter.hit("stu1").await, WindowHit { count: 2, blocked: false });
        assert_eq!(limiter.hit("stu1").await, WindowHit { count: 3, blocked: true });
        assert_eq!(limiter.current("stu1").await, 3);
    }

    #[tokio::test]
    async fn identities_are_counted_separately() {
        let limiter = limiter();
        limiter.hit("a").await;
        limiter.hit("a").await;
        assert_eq!(limiter.hit("b").await.count, 1);
    }

    #[tokio::test]
    async fn reset_starts_fresh_window() {
        let limiter = limiter();
        for _ in 0..3 {
            limiter.hit("stu1").await;
        }
        limiter.reset("stu1").await.unwrap();
        assert_eq!(limiter.current("stu1").await, 0);
        assert_eq!(limiter.hit("stu1").await.count, 1);
    }

    #[tokio::test]
    async fn garbage_counter_counts_as_zero() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_with_expiry("student:x", "NaN", Duration::from_secs(60))
            .await
            .unwrap();
        let limiter = WindowLimiter::new(store, 2, Duration::from_secs(60));
        assert_eq!(limiter.hit("x").await.count, 1);
    }

    #[tokio::test]
    async fn broken_store_fails_open() {
        let limiter = WindowLimiter::new(Arc::new(BrokenStore), 2, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(!limiter.hit("stu1").await.blocked);
        }
        assert_eq!(limiter.current("stu1").await, 0);
        assert!(limiter.reset("stu1").await.is_err());
    }

    #[tokio::test]
    async fn window_expires_after_last_hit() {
        let limiter = WindowLimiter::new(
            Arc::new(MemoryStore::new()),
            2,
            Duration::from_millis(100),
        );
        limiter.hit("stu1").await;
        limiter.hit("stu1").await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(limiter.hit("stu1").await.count, 1);
    }
}
