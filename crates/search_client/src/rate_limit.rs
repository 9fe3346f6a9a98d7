//! Outbound request limiter shared by searches and page fetches.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = GovLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Single token bucket; clones share the same bucket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
}

impl RateLimiter {
    /// A zero rate is treated as one request per second.
    pub fn per_second(requests_per_sec: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_sec).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(GovLimiter::direct(Quota::per_second(rate))),
        }
    }

    /// Wait until a request slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to take a slot without waiting.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_second(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_exhausts_bucket() {
        let limiter = RateLimiter::per_second(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_clones_share_bucket() {
        let a = RateLimiter::per_second(1);
        let b = a.clone();
        assert!(a.try_acquire());
        assert!(!b.try_acquire());
    }

    #[test]
    fn test_zero_rate_still_admits() {
        assert!(RateLimiter::per_second(0).try_acquire());
    }
}
