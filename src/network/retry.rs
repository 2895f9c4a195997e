//! Retry logic with exponential backoff and error classification

use std::time::Duration;
use anyhow::Result;
use tracing::warn;
use crate::errors::{RelayError, RelayResult, is_retryable};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff for the given attempt (1-based), before jitter. Grows by the
    /// exponential base and caps at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(32);
        let delay = self.initial_delay_ms as f64 * self.exponential_base.powi(exp as i32);
        (delay as u64).min(self.max_delay_ms)
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
/// Errors classified as fatal (insufficient funds, reverted execution, user
/// rejection, unknown) propagate immediately without another attempt.
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    context: &str,
) -> RelayResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !is_retryable(&e) => {
                return Err(RelayError::Network {
                    message: format!("{} failed with a non-retryable error", context),
                    source: Some(e),
                    retry_count: attempt,
                });
            }
            Err(e) if attempt >= config.max_attempts => {
                return Err(RelayError::Network {
                    message: format!("{} failed after {} attempts", context, attempt),
                    source: Some(e),
                    retry_count: attempt,
                });
            }
            Err(e) => {
                let mut delay = config.delay_for_attempt(attempt);
                let jitter = (delay as f64 * 0.1 * (rand::random::<f64>() - 0.5)) as u64;
                delay = delay.saturating_add(jitter);

                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt, config.max_attempts, context, e, delay
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
