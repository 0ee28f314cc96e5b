//! Exponential backoff with jitter.

use fiscus_core::config::RetryConfig;
use fiscus_core::error::FiscusError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry policy: exponential backoff with random jitter between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    factor: f64,
    jitter: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            factor: config.factor,
            jitter: config.jitter,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deterministic part of the delay after a failed attempt (0-based),
    /// before jitter: `min(base * factor^attempt, cap)`.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exp = (self.base_delay_ms as f64) * self.factor.powi(attempt as i32);
        Duration::from_millis(exp.min(self.max_delay_ms as f64) as u64)
    }

    /// Delay with jitter applied: base delay plus a random fraction of it.
    fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for(attempt);
        let jitter = rand::thread_rng().gen_range(0.0..=self.jitter);
        base.mul_f64(1.0 + jitter)
    }

    /// Run `op` up to `max_attempts` times, sleeping between failures.
    /// Returns the last error when all attempts fail.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, FiscusError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FiscusError>>,
    {
        let mut last_err = None;
        for attempt in 0..self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < self.max_attempts {
                        let delay = self.jittered_delay_for(attempt);
                        debug!(
                            "retry attempt {}/{} after {}ms",
                            attempt + 1,
                            self.max_attempts,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| FiscusError::Provider("retry: no attempts made".to_string())))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
