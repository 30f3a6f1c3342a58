use async_trait::async_trait;
use std::sync::Arc;

use super::cache::CacheStage;
use super::error::FetchResult;
use super::rate_limit::RateLimitStage;
use super::request::FetchRequest;
use super::transport::{Transport, TransportStage};
use crate::config::FetchSettings;
use crate::observability::FetchMetrics;

/// One step of the fetch pipeline
///
/// A stage either answers a request itself or hands it to the stage it wraps.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn process(&self, request: &FetchRequest) -> FetchResult;
}

/// Cache, then rate limit, then the network call
///
/// A cache hit never reaches the rate limiter; a miss waits its turn before
/// the transport runs.
pub struct FetchPipeline {
    cache: CacheStage,
}

impl FetchPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: &FetchSettings,
        metrics: Arc<FetchMetrics>,
    ) -> Self {
        let network: Arc<dyn Stage> = Arc::new(TransportStage::new(transport, metrics.clone()));
        Self::with_stage(network, settings, metrics)
    }

    /// Wrap an arbitrary innermost stage with the cache and rate limiter
    pub fn with_stage(
        innermost: Arc<dyn Stage>,
        settings: &FetchSettings,
        metrics: Arc<FetchMetrics>,
    ) -> Self {
        let throttled: Arc<dyn Stage> = Arc::new(RateLimitStage::new(
            settings.rate_limit_wait.as_duration(),
            innermost,
        ));
        Self {
            cache: CacheStage::new(settings.cache_capacity, throttled, metrics),
        }
    }

    pub fn cache(&self) -> &CacheStage {
        &self.cache
    }
}

#[async_trait]
impl Stage for FetchPipeline {
    async fn process(&self, request: &FetchRequest) -> FetchResult {
        self.cache.process(request).await
    }
}
