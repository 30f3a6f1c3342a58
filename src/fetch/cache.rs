use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::sync::Arc;
use tracing::debug;

use super::error::FetchResult;
use super::pipeline::Stage;
use super::request::FetchRequest;
use crate::observability::FetchMetrics;

/// Default number of distinct requests remembered
pub const DEFAULT_CACHE_CAPACITY: u64 = 100;

/// Memoizes results per full request, failures included
///
/// Bounded, least-recently-used eviction. Concurrent misses for the same
/// request share one computation.
pub struct CacheStage {
    entries: Cache<FetchRequest, FetchResult>,
    next: Arc<dyn Stage>,
    metrics: Arc<FetchMetrics>,
}

impl CacheStage {
    pub fn new(capacity: u64, next: Arc<dyn Stage>, metrics: Arc<FetchMetrics>) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            entries,
            next,
            metrics,
        }
    }

    /// Number of cached requests, after pending evictions are applied
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a result is stored, without touching recency
    pub fn contains(&self, request: &FetchRequest) -> bool {
        self.entries.contains_key(request)
    }

    /// Forget everything, letting previously failed requests be retried
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
        debug!("Fetch cache cleared");
    }
}

#[async_trait]
impl Stage for CacheStage {
    async fn process(&self, request: &FetchRequest) -> FetchResult {
        let entry = self
            .entries
            .entry_by_ref(request)
            .or_insert_with(self.next.process(request))
            .await;

        if entry.is_fresh() {
            debug!(url = %request.url, "Cache miss");
            self.metrics.cache_miss();
        } else {
            debug!(url = %request.url, "Cache hit");
            self.metrics.cache_hit();
        }

        entry.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Payload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoStage {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Stage for EchoStage {
        async fn process(&self, request: &FetchRequest) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Payload::Text(request.url.clone()))
        }
    }

    fn cache(capacity: u64) -> (CacheStage, Arc<EchoStage>, Arc<FetchMetrics>) {
        let inner = Arc::new(EchoStage {
            calls: AtomicUsize::new(0),
        });
        let metrics = Arc::new(FetchMetrics::new());
        let stage = CacheStage::new(capacity, inner.clone(), metrics.clone());
        (stage, inner, metrics)
    }

    fn request(n: usize) -> FetchRequest {
        FetchRequest::get(format!("https://example.com/{}", n))
    }

    #[tokio::test]
    async fn test_identical_requests_compute_once() {
        let (stage, inner, metrics) = cache(DEFAULT_CACHE_CAPACITY);

        let first = stage.process(&request(1)).await.unwrap();
        let second = stage.process(&request(1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_entry() {
        let (stage, _inner, _metrics) = cache(DEFAULT_CACHE_CAPACITY);

        for n in 0..=100 {
            stage.process(&request(n)).await.unwrap();
        }

        assert_eq!(stage.len().await, 100);
        assert!(!stage.contains(&request(0)));
        assert!(stage.contains(&request(1)));
        assert!(stage.contains(&request(100)));
    }

    #[tokio::test]
    async fn test_recent_use_protects_from_eviction() {
        let (stage, _inner, _metrics) = cache(DEFAULT_CACHE_CAPACITY);

        for n in 0..100 {
            stage.process(&request(n)).await.unwrap();
        }
        stage.len().await;

        // Touch the oldest entry so the second-oldest becomes the victim
        stage.process(&request(0)).await.unwrap();
        stage.len().await;

        stage.process(&request(100)).await.unwrap();

        assert_eq!(stage.len().await, 100);
        assert!(stage.contains(&request(0)));
        assert!(!stage.contains(&request(1)));
    }

    #[tokio::test]
    async fn test_clear_allows_recompute() {
        let (stage, inner, _metrics) = cache(DEFAULT_CACHE_CAPACITY);

        stage.process(&request(1)).await.unwrap();
        stage.clear().await;
        assert!(stage.is_empty().await);

        stage.process(&request(1)).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
