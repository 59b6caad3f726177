//! Bounded retry with pluggable backoff
//!
//! Wraps an async operation: `retry(policy, op, should_retry)` calls `op`
//! with the 1-based attempt number until it succeeds, fails with an error the
//! predicate rejects, or `max_attempts` is reached.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Default total attempts (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default lower bound of the randomized wait
pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(5);
/// Default upper bound of the randomized wait
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(7);

/// Wait between two attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Always wait the same amount
    Fixed(Duration),
    /// Uniformly random wait in `[min, max]`, spreading out retries of
    /// operations that started together
    Random { min: Duration, max: Duration },
}

impl Backoff {
    pub fn delay(&self) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Random { min, max } => {
                if max <= min {
                    return min;
                }
                let lo = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
                let hi = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::rng().random_range(lo..=hi))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; 0 is treated as 1
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::Random {
                min: DEFAULT_BACKOFF_MIN,
                max: DEFAULT_BACKOFF_MAX,
            },
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Fixed-interval variant: 3 attempts, 5 seconds apart
    pub fn fixed() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Backoff::Fixed(DEFAULT_BACKOFF_MIN))
    }

    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::Fixed(Duration::ZERO))
    }
}

/// The operation gave up: either attempts ran out or the error was not retryable
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: Display> Display for Exhausted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gave up after {} attempt(s): {}", self.attempts, self.last_error)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Exhausted<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last_error)
    }
}

pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut op: F,
    should_retry: P,
) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let delay = policy.backoff.delay();
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(Exhausted {
                    attempts: attempt,
                    last_error: e,
                })
            }
        }
    }
}
