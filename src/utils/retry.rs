// src/utils/retry.rs

//! Bounded retry with backoff.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// How many times an operation runs and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, returns an error `should_retry`
    /// rejects, or the attempt bound is reached. The last error is returned.
    pub async fn run<T, E, F, Fut, R>(&self, mut operation: F, should_retry: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && should_retry(&e) => {
                    let delay = self.backoff.delay(attempt);
                    log::debug!(
                        "Attempt {}/{} failed: {}. Retrying in {}ms",
                        attempt,
                        self.max_attempts,
                        e,
                        delay.as_millis()
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::Fixed(Duration::ZERO))
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(350),
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(350));
        assert_eq!(backoff.delay(40), Duration::from_millis(350));
    }

    #[test]
    fn test_fixed_delay() {
        let backoff = Backoff::Fixed(Duration::from_secs(2));
        assert_eq!(backoff.delay(1), backoff.delay(5));
    }

    #[tokio::test]
    async fn test_stops_at_attempt_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = instant(3)
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("boom".to_string()) }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_first_success() {
        let result: Result<u32, String> = instant(5)
            .run(
                |attempt| async move {
                    if attempt < 3 {
                        Err(format!("attempt {attempt}"))
                    } else {
                        Ok(attempt)
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = instant(4)
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal".to_string()) }
                },
                |e| e != "fatal",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(instant(0).max_attempts(), 1);
    }
}
