use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::error::FetchResult;
use super::pipeline::Stage;
use super::request::FetchRequest;

/// Enforces a minimum gap between one completion and the next start
///
/// The lock is held for the wait, the call and the timestamp update, so
/// overlapping callers queue up instead of slipping through together.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_completion: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_completion: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op` once the interval since the previous completion has passed
    pub async fn invoke<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last = self.last_completion.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                debug!(
                    wait_ms = remaining.as_millis() as u64,
                    "Rate limited, waiting"
                );
                tokio::time::sleep(remaining).await;
            }
        }

        let result = op().await;
        *last = Some(Instant::now());
        result
    }
}

/// Pipeline stage that throttles everything below it
pub struct RateLimitStage {
    limiter: RateLimiter,
    next: Arc<dyn Stage>,
}

impl RateLimitStage {
    pub fn new(interval: Duration, next: Arc<dyn Stage>) -> Self {
        Self {
            limiter: RateLimiter::new(interval),
            next,
        }
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    async fn process(&self, request: &FetchRequest) -> FetchResult {
        self.limiter.invoke(|| self.next.process(request)).await
    }
}
