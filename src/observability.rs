//! Fetch counters and tracing setup

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honouring `RUST_LOG` (default `info`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Counters for one fetch pipeline
#[derive(Debug, Default)]
pub struct FetchMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    network_requests: AtomicU64,
    failures: AtomicU64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "cache_hits", "Metric incremented");
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "cache_misses", "Metric incremented");
    }

    pub fn network_request(&self) {
        self.network_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_requests: self.network_requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub network_requests: u64,
    pub failures: u64,
}
