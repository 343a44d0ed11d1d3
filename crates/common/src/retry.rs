//! Retry policy with exponential backoff and jitter.
//!
//! Callers supply an error-kind predicate; the loop never inspects error
//! messages. Terminal errors (revoked consent, definitive rejections) must
//! classify as non-retryable so they surface immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Backoff configuration for retryable remote failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 4, base_delay_ms: 1000, max_delay_ms: 32_000 }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), exponential with
    /// ±25% jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt.min(16)));
        let capped = exp.min(self.max_delay_ms);

        // ±25% jitter
        let jitter_range = capped / 4;
        let low = capped.saturating_sub(jitter_range);
        let high = capped.saturating_add(jitter_range);
        let with_jitter =
            if low == high { capped } else { rand::thread_rng().gen_range(low..=high) };

        Duration::from_millis(with_jitter.max(1))
    }

    /// Run `op` until it succeeds, the error classifies as non-retryable, or
    /// attempts are exhausted.
    pub async fn run<T, E, Fut, Op, Cls>(&self, mut op: Op, is_retryable: Cls) -> Result<T, E>
    where
        E: std::fmt::Display,
        Fut: Future<Output = Result<T, E>>,
        Op: FnMut() -> Fut,
        Cls: Fn(&E) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < self.max_attempts && is_retryable(&err) => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(attempt, error = %err, "giving up");
                    return Err(err);
                }
            }
        }
    }
}
