use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry schedule for upstream calls: exponential backoff on transient errors
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// Delay before the given retry attempt (1-based), capped at 32x the initial backoff
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5);
        self.initial_backoff * (1 << exponent)
    }

    /// Run `op` until it succeeds, fails permanently, or the retry budget runs out
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retries < self.max_retries && e.is_transient() => {
                    retries += 1;
                    let backoff = self.backoff(retries);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label,
                        retries,
                        self.max_retries,
                        e.log_safe(),
                        backoff
                    );
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}
