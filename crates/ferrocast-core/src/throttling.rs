use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spreads provider calls so at most `limit` start within any `window`.
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Arc<DirectRateLimiter>,
}

impl RequestPacer {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(window, limit))),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(Duration::from_secs(60), limit)
    }

    /// Takes a slot if one is free right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Waits until a slot frees up.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer").finish_non_exhaustive()
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .map(|quota| quota.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_second(burst))
}
