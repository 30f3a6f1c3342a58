//! Rate-limited, cached, multi-format HTTP fetching
//!
//! Every handler owns a [`Fetcher`]. A fetch flows through an explicit
//! pipeline of stages:
//!
//! - [`CacheStage`] answers repeated requests (failures included)
//! - [`RateLimitStage`] spaces out network calls
//! - [`TransportStage`] validates the proxy, sends the GET, rejects failed
//!   statuses and decodes the body
//!
//! ## Example
//!
//! ```rust,no_run
//! use showfetch::config::FetchSettings;
//! use showfetch::fetch::{FetchRequest, Fetcher, OutputMode};
//!
//! # async fn example() -> Result<(), showfetch::fetch::FetchError> {
//! let fetcher = Fetcher::new(&FetchSettings::default())?;
//! let request = FetchRequest::builder()
//!     .url("https://example.com/api/shows")
//!     .mode(OutputMode::Json)
//!     .build();
//!
//! if let Some(payload) = fetcher.fetch(&request).await {
//!     println!("{:?}", payload.as_json());
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
mod payload;
mod pipeline;
mod rate_limit;
mod request;
mod transport;

pub use cache::{CacheStage, DEFAULT_CACHE_CAPACITY};
pub use error::{FetchError, FetchResult};
pub use payload::{HtmlDocument, Payload, XmlElement};
pub use pipeline::{FetchPipeline, Stage};
pub use rate_limit::{RateLimitStage, RateLimiter};
pub use request::{BasicAuth, FetchRequest, OutputMode, ProxyArg};
pub use transport::{
    HttpConfig, ReqwestTransport, Transport, TransportRequest, TransportResponse, TransportStage,
};

use std::sync::Arc;

use crate::config::FetchSettings;
use crate::observability::{FetchMetrics, MetricsSnapshot};

/// The request capability embedded in every handler
///
/// Cloning shares the cache, the rate limiter and the counters.
#[derive(Clone)]
pub struct Fetcher {
    pipeline: Arc<FetchPipeline>,
    metrics: Arc<FetchMetrics>,
}

impl Fetcher {
    /// Fetcher with its own reqwest transport
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(HttpConfig::from(settings))?;
        Ok(Self::with_transport(Arc::new(transport), settings))
    }

    /// Fetcher over a shared or substitute transport
    pub fn with_transport(transport: Arc<dyn Transport>, settings: &FetchSettings) -> Self {
        let metrics = Arc::new(FetchMetrics::new());
        let pipeline = FetchPipeline::new(transport, settings, metrics.clone());
        Self {
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }

    /// The decoded payload, or `None` on any failure (already logged)
    pub async fn fetch(&self, request: &FetchRequest) -> Option<Payload> {
        self.try_fetch(request).await.ok()
    }

    /// Like [`Fetcher::fetch`] but keeps the failure reason
    pub async fn try_fetch(&self, request: &FetchRequest) -> FetchResult {
        self.pipeline.process(request).await
    }

    pub async fn clear_cache(&self) {
        self.pipeline.cache().clear().await;
    }

    pub async fn cached_entries(&self) -> u64 {
        self.pipeline.cache().len().await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}
