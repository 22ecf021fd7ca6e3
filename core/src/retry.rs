//! Bounded retry with a fixed pause and a replaceable predicate.
//!
//! The default policy retries every failure kind: three attempts in total,
//! two seconds apart. `retry_if` swaps the predicate so a caller can make
//! retries selective (for example skip 4xx) without touching the executor.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiClientError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

type Predicate = Arc<dyn Fn(&ApiClientError) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    predicate: Predicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Up to `max_attempts` attempts in total (at least one), `delay` apart,
    /// retrying on any failure.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            predicate: Arc::new(|_| true),
        }
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Replace the predicate deciding whether a failure is worth another attempt.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ApiClientError) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether attempt number `attempt` (1-based), which failed with `err`,
    /// should be followed by another one.
    pub fn should_retry(&self, attempt: u32, err: &ApiClientError) -> bool {
        attempt < self.max_attempts && (self.predicate)(err)
    }
}
