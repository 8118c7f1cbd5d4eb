//! Fixed-delay retry for rate-limited model calls.
//!
//! Only `RateLimited` errors are retried. The delay is constant between
//! attempts: no jitter and no exponential growth.

use std::future::Future;
use std::time::Duration;

use crate::llm::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy for plan generation against the primary model.
    pub const PLAN_GENERATION: RetryPolicy = RetryPolicy {
        max_retries: 3,
        delay: Duration::from_secs(2),
    };

    /// Policy for each analysis against the primary model.
    pub const ANALYSIS: RetryPolicy = RetryPolicy {
        max_retries: 2,
        delay: Duration::from_secs(2),
    };

    /// Single attempt.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        delay: Duration::ZERO,
    };

    /// Run `call` until it succeeds, fails with a non rate-limit error, or
    /// the retry budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                Ok(value) => {
                    if retries > 0 {
                        tracing::info!("{} succeeded after {} retries", label, retries);
                    }
                    return Ok(value);
                }
                Err(error) if error.is_rate_limited() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        "{} rate limited, retry {}/{} in {:?}: {}",
                        label,
                        retries,
                        self.max_retries,
                        self.delay,
                        error.message
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(error) => {
                    if error.is_rate_limited() {
                        tracing::warn!("{} still rate limited after {} retries", label, retries);
                    }
                    return Err(error);
                }
            }
        }
    }
}
