//! Tenant-scoped cache in front of a [`Resolver`].
//!
//! The resolver itself never caches. This collaborator keeps successful
//! records for a time-to-live, keyed by tenant and normalized key, so one
//! restaurant's lookups are never served to another. Failures are not cached.
//!
//! Concurrent misses for the same tenant and key share one provider lookup.
//! Expired entries are swept whenever a new record is stored.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use cep_types::{LookupError, LookupKey};
use tokio::{sync::Mutex as FetchLock, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::resolver::Resolver;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    tenant_id: String,
    key: LookupKey,
}

#[derive(Debug, Clone)]
struct CacheEntry<R> {
    fetched_at: Instant,
    record: R,
}

#[derive(Debug)]
pub struct CachedResolver<R> {
    resolver: Resolver<R>,
    cache: Arc<Mutex<HashMap<CacheKey, CacheEntry<R>>>>,
    cache_time_to_live: Duration,
    active_fetches: Arc<Mutex<HashMap<CacheKey, Arc<FetchLock<()>>>>>,
}

impl<R: Clone> CachedResolver<R> {
    pub fn new(resolver: Resolver<R>, cache_time_to_live: Duration) -> Self {
        Self {
            resolver,
            cache: Arc::new(Mutex::new(HashMap::new())),
            cache_time_to_live,
            active_fetches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn resolver(&self) -> &Resolver<R> {
        &self.resolver
    }

    /// Resolve `raw_key` for `tenant_id`, serving a fresh cached record when
    /// one exists for that same tenant.
    pub async fn resolve(&self, tenant_id: &str, raw_key: &str) -> Result<R, LookupError> {
        self.resolve_with_cancellation(tenant_id, raw_key, &CancellationToken::new())
            .await
    }

    pub async fn resolve_with_cancellation(
        &self,
        tenant_id: &str,
        raw_key: &str,
        cancellation: &CancellationToken,
    ) -> Result<R, LookupError> {
        let key = self.resolver.shape().normalize(raw_key)?;
        let cache_key = CacheKey {
            tenant_id: tenant_id.to_string(),
            key,
        };

        if let Some(record) = self.lookup_fresh(&cache_key) {
            debug!(tenant_id, key = %cache_key.key, "lookup served from cache");
            return Ok(record);
        }

        let fetch_lock = self.begin_fetch(&cache_key);
        let _in_flight = fetch_lock.lock().await;
        if let Some(record) = self.lookup_fresh(&cache_key) {
            debug!(tenant_id, key = %cache_key.key, "lookup served by concurrent fetch");
            return Ok(record);
        }

        let outcome = self.resolver.resolve_key(&cache_key.key, cancellation).await;
        if let Ok(record) = &outcome {
            self.store(cache_key.clone(), record.clone());
        }
        self.finish_fetch(&cache_key, &fetch_lock);
        outcome
    }

    /// Drop every entry that belongs to `tenant_id`, e.g. on sign-out.
    /// Returns how many entries were removed.
    pub fn invalidate_tenant(&self, tenant_id: &str) -> usize {
        let mut cache = self.lock();
        let before = cache.len();
        cache.retain(|cache_key, _| cache_key.tenant_id != tenant_id);
        let removed = before - cache.len();
        debug!(tenant_id, removed, "tenant cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cached entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup_fresh(&self, cache_key: &CacheKey) -> Option<R> {
        let mut cache = self.lock();
        let entry = cache.get(cache_key)?;
        if entry.fetched_at.elapsed() < self.cache_time_to_live {
            return Some(entry.record.clone());
        }
        cache.remove(cache_key);
        None
    }

    fn store(&self, cache_key: CacheKey, record: R) {
        let mut cache = self.lock();
        cache.retain(|_, entry| entry.fetched_at.elapsed() < self.cache_time_to_live);
        cache.insert(
            cache_key,
            CacheEntry {
                fetched_at: Instant::now(),
                record,
            },
        );
    }

    /// The per-key lock every concurrent miss for `cache_key` waits on.
    fn begin_fetch(&self, cache_key: &CacheKey) -> Arc<FetchLock<()>> {
        let mut active = self.active_fetches.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(active.entry(cache_key.clone()).or_default())
    }

    fn finish_fetch(&self, cache_key: &CacheKey, fetch_lock: &Arc<FetchLock<()>>) {
        let mut active = self.active_fetches.lock().unwrap_or_else(PoisonError::into_inner);
        if active.get(cache_key).is_some_and(|current| Arc::ptr_eq(current, fetch_lock)) {
            active.remove(cache_key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry<R>>> {
        // Entries are plain data; a panic mid-insert cannot leave them inconsistent.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R> Clone for CachedResolver<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            cache: Arc::clone(&self.cache),
            cache_time_to_live: self.cache_time_to_live,
            active_fetches: Arc::clone(&self.active_fetches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FetchError, ProviderFetcher, ProviderSpec};
    use async_trait::async_trait;
    use cep_types::{KeyShape, ProviderResponse, TransformError};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// Answers with the requested path and counts calls. Paths ending in
    /// `99999999` are reported as not found.
    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl ProviderFetcher for CountingFetcher {
        async fn fetch(&self, url: &Url, _cancellation: &CancellationToken) -> Result<ProviderResponse, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if url.path().ends_with("99999999") {
                return Ok(ProviderResponse::new(404, Value::Null));
            }
            Ok(ProviderResponse::ok(json!({"path": url.path(), "call": call})))
        }
    }

    fn transform(_key: &LookupKey, response: &ProviderResponse) -> Result<Value, TransformError> {
        if response.status == 404 {
            return Err(TransformError::NotFound);
        }
        Ok(response.body.clone())
    }

    fn cached(fetcher: Arc<CountingFetcher>, ttl: Duration) -> CachedResolver<Value> {
        let resolver = Resolver::builder(KeyShape::CEP)
            .provider(ProviderSpec::new(
                "counting",
                Duration::from_millis(100),
                |key: &LookupKey| format!("https://counting.test/{key}"),
                transform,
            ))
            .fetcher(fetcher)
            .build()
            .unwrap();
        CachedResolver::new(resolver, ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn same_tenant_hits_cache_until_expiry() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = cached(Arc::clone(&fetcher), Duration::from_secs(60));

        let first = cached.resolve("tenant-a", "01001-000").await.unwrap();
        let second = cached.resolve("tenant-a", "01001000").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = cached.resolve("tenant-a", "01001000").await.unwrap();
        assert_eq!(third["call"], json!(2));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn tenants_never_share_entries() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = cached(Arc::clone(&fetcher), Duration::from_secs(60));

        let for_a = cached.resolve("tenant-a", "01001000").await.unwrap();
        let for_b = cached.resolve("tenant-b", "01001000").await.unwrap();
        assert_eq!(for_a["call"], json!(1));
        assert_eq!(for_b["call"], json!(2));
        assert_eq!(cached.len(), 2);
    }

    #[tokio::test]
    async fn invalidating_a_tenant_leaves_others_alone() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = cached(Arc::clone(&fetcher), Duration::from_secs(60));

        cached.resolve("tenant-a", "01001000").await.unwrap();
        cached.resolve("tenant-a", "20040002").await.unwrap();
        cached.resolve("tenant-b", "01001000").await.unwrap();

        assert_eq!(cached.invalidate_tenant("tenant-a"), 2);
        assert_eq!(cached.len(), 1);

        cached.resolve("tenant-b", "01001000").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        cached.clear();
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = cached(Arc::clone(&fetcher), Duration::from_secs(60));

        assert_eq!(cached.resolve("tenant-a", "99999999").await, Err(LookupError::Exhausted));
        assert_eq!(cached.resolve("tenant-a", "99999999").await, Err(LookupError::Exhausted));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

        assert_eq!(
            cached.resolve("tenant-a", "abc").await,
            Err(LookupError::InvalidKey { expected_digits: 8 })
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_fetch() {
        let fetcher = Arc::new(CountingFetcher {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let cached = cached(Arc::clone(&fetcher), Duration::from_secs(60));

        let (first, second) = tokio::join!(
            cached.resolve("tenant-a", "01001000"),
            cached.resolve("tenant-a", "01001-000")
        );
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let (for_a, for_b) = tokio::join!(
            cached.resolve("tenant-a", "20040002"),
            cached.resolve("tenant-b", "20040002")
        );
        assert_ne!(for_a.unwrap(), for_b.unwrap());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn storing_sweeps_expired_entries() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = cached(Arc::clone(&fetcher), Duration::from_secs(60));

        cached.resolve("tenant-a", "01001000").await.unwrap();
        cached.resolve("tenant-b", "01001000").await.unwrap();
        assert_eq!(cached.len(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        cached.resolve("tenant-a", "20040002").await.unwrap();
        assert_eq!(cached.len(), 1);
    }
}
