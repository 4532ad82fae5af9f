//! Single-flight memoization with TTL expiry.
//!
//! Each key owns a slot guarded by an async mutex. The first caller to find
//! a slot empty or expired holds the lock while its producer runs; callers
//! arriving meanwhile wait on the same lock and read the fresh value.
//!
//! The producer runs as its own task. If the caller that dispatched it goes
//! away, the task still finishes and fills the slot for everyone else.
//! Only successful results are stored: a failed producer releases the slot
//! and the next caller runs its own.

use std::future::Future;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::CacheError;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Producer invocations.
    pub misses: u64,
}

/// A TTL cache that runs at most one producer per key at a time.
pub struct SingleFlightCache<V> {
    slots: DashMap<String, Slot<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> SingleFlightCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, or run `producer` to obtain it.
    ///
    /// Concurrent callers for the same missing key share one producer
    /// invocation. A successful result is kept for `ttl`; an error is
    /// returned to the waiting caller and never stored.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, ttl: Duration, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: From<CacheError> + Send + 'static,
    {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut guard = slot.lock_owned().await;
        if let Some(entry) = guard.as_ref().filter(|e| e.is_fresh(Instant::now())) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.value.clone());
        }
        *guard = None;
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(key, "cache miss");

        let fut = producer();
        let task = tokio::spawn(async move {
            let result = fut.await;
            if let Ok(value) = &result {
                *guard = Some(Entry {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                });
            }
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(_) => Err(CacheError::ProducerAborted {
                key: key.to_string(),
            }
            .into()),
        }
    }

    /// Return the cached value if present and fresh, without producing.
    pub fn peek(&self, key: &str) -> Option<V> {
        let slot = self.slots.get(key)?.clone();
        let guard = slot.try_lock().ok()?;
        let value = guard
            .as_ref()
            .filter(|e| e.is_fresh(Instant::now()))
            .map(|e| e.value.clone());
        value
    }

    /// Drop the value for `key`. A producer already in flight finishes
    /// into a detached slot; later callers start fresh.
    pub fn invalidate(&self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drop every cached value matching `pred`. Slots with a producer in
    /// flight are left alone. Returns the number dropped.
    pub fn invalidate_matching(&self, pred: impl Fn(&V) -> bool) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| match slot.try_lock() {
            Ok(guard) => !guard.as_ref().is_some_and(|e| pred(&e.value)),
            Err(_) => true,
        });
        before.saturating_sub(self.slots.len())
    }

    /// Drop every slot.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Remove expired and empty slots that no caller is using.
    /// Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            // Anyone else holding the Arc is about to use the slot.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(guard) => guard.as_ref().is_some_and(|e| e.is_fresh(now)),
                Err(_) => true,
            }
        });
        before.saturating_sub(self.slots.len())
    }

    /// Number of keys currently tracked, including expired entries not yet
    /// purged.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<V> Default for SingleFlightCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Upstream,
        Cache(CacheError),
    }

    impl From<CacheError> for TestError {
        fn from(e: CacheError) -> Self {
            TestError::Cache(e)
        }
    }

    const TTL: Duration = Duration::from_secs(30);

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_under_concurrency() {
        let cache = Arc::new(SingleFlightCache::<u64>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_set("k", TTL, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, TestError>(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 31);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_keys_do_not_serialize() {
        let cache = Arc::new(SingleFlightCache::<String>::new());
        let mut handles = Vec::new();
        for i in 0..10 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("k{i}");
                cache
                    .get_or_set(&key, TTL, move || async move { Ok::<_, TestError>(format!("v{i}")) })
                    .await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Ok(format!("v{i}")));
        }
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = SingleFlightCache::<u64>::new();

        let first = cache
            .get_or_set("k", TTL, || async { Err::<u64, _>(TestError::Upstream) })
            .await;
        assert_eq!(first, Err(TestError::Upstream));
        assert_eq!(cache.peek("k"), None);

        let second = cache
            .get_or_set("k", TTL, || async { Ok::<_, TestError>(7) })
            .await;
        assert_eq!(second, Ok(7));
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_retry_after_leader_failure() {
        let cache = Arc::new(SingleFlightCache::<u64>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_set("k", TTL, move || async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        if n == 0 {
                            Err(TestError::Upstream)
                        } else {
                            Ok(5)
                        }
                    })
                    .await
            }));
        }

        let results: Vec<_> = join_all(handles).await;
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(results.iter().filter(|r| **r == Ok(5)).count(), 9);
        // One failed attempt, then a single successful one shared by the rest.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    async fn join_all(
        handles: Vec<tokio::task::JoinHandle<Result<u64, TestError>>>,
    ) -> Vec<Result<u64, TestError>> {
        let mut out = Vec::new();
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_by_ttl() {
        let cache = SingleFlightCache::<u64>::new();
        let ttl = Duration::from_secs(10);

        cache.get_or_set("k", ttl, || async { Ok::<_, TestError>(1) }).await.unwrap();
        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(
            cache.get_or_set("k", ttl, || async { Ok::<_, TestError>(2) }).await,
            Ok(1)
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.peek("k"), None);
        assert_eq!(
            cache.get_or_set("k", ttl, || async { Ok::<_, TestError>(2) }).await,
            Ok(2)
        );
    }

    #[tokio::test]
    async fn test_invalidate_forces_reproduce() {
        let cache = SingleFlightCache::<u64>::new();
        cache.get_or_set("k", TTL, || async { Ok::<_, TestError>(1) }).await.unwrap();
        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));
        assert_eq!(
            cache.get_or_set("k", TTL, || async { Ok::<_, TestError>(2) }).await,
            Ok(2)
        );
    }

    #[tokio::test]
    async fn test_invalidate_matching() {
        let cache = SingleFlightCache::<u64>::new();
        for (key, v) in [("a", 1), ("b", 2), ("c", 1)] {
            cache.get_or_set(key, TTL, move || async move { Ok::<_, TestError>(v) }).await.unwrap();
        }
        assert_eq!(cache.invalidate_matching(|v| *v == 1), 2);
        assert_eq!(cache.peek("b"), Some(2));
        assert_eq!(cache.peek("a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = SingleFlightCache::<u64>::new();
        cache
            .get_or_set("short", Duration::from_secs(1), || async { Ok::<_, TestError>(1) })
            .await
            .unwrap();
        cache
            .get_or_set("long", Duration::from_secs(100), || async { Ok::<_, TestError>(2) })
            .await
            .unwrap();
        let _ = cache
            .get_or_set("failed", TTL, || async { Err::<u64, _>(TestError::Upstream) })
            .await;
        assert_eq!(cache.len(), 3);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek("long"), Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_caller_still_fills_cache() {
        let cache = Arc::new(SingleFlightCache::<u64>::new());

        let leader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_set("k", TTL, || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, TestError>(9)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        leader.abort();

        let value = cache
            .get_or_set("k", TTL, || async { Ok::<_, TestError>(0) })
            .await;
        assert_eq!(value, Ok(9));
    }
}
