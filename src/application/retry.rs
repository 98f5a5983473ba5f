//! Bounded retry with capped exponential backoff, used by the saga steps.

use crate::config::RetryConfig;
use crate::error::{PenaltyError, Result};
use log::warn;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay(), config.max_delay())
    }

    /// Run `operation` up to `max_attempts` times, doubling the delay
    /// between attempts up to `max_delay`. Returns the last error once the
    /// attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= self.max_attempts => {
                    warn!("{label}: attempt {attempt}/{} failed, giving up: {error}",
                        self.max_attempts);
                    return Err(error);
                }
                Err(error) => {
                    warn!(
                        "{label}: attempt {attempt}/{} failed, retrying in {:?}: {error}",
                        self.max_attempts, delay
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
            }
        }
    }
}
