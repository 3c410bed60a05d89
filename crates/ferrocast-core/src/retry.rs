//! Retry loop with exponential backoff and jitter for provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::data_source::SourceError;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally jittered by +/- 50%.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let seconds = base.as_secs_f64() * factor.powi(attempt as i32);
                let delay = Duration::from_secs_f64(seconds.min(max.as_secs_f64()));
                if !jitter {
                    return delay;
                }

                let millis = delay.as_millis() as u64;
                let spread = millis / 2;
                let offset = fastrand::u64(0..=spread * 2);
                Duration::from_millis((millis + offset).saturating_sub(spread))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// HTTP statuses classified as transient by the adapters.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent. The closure receives the attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if error.retryable() && attempt < self.max_retries => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        operation = label,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying provider request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
