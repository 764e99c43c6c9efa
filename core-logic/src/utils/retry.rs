//! # Retry and backoff helpers
//!
//! Two pacing policies are used by the bots:
//!
//! - [`LinearBackoff`] + [`retry_with_backoff`]: a bounded number of attempts
//!   with `attempt * step` between them (handshakes, token acquisition).
//! - [`ReconnectBackoff`]: a doubling, capped delay for long-lived
//!   connections that keep dropping.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Bounded attempts with linearly growing delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` (1-based) is `n * step`.
    pub step: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            step: Duration::from_secs(2),
        }
    }
}

impl LinearBackoff {
    pub fn new(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step * attempt
    }
}

/// Why [`retry_with_backoff`] gave up.
#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Display + fmt::Debug> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("non-retryable failure on attempt {attempt}: {error}")]
    Fatal { attempt: u32, error: E },
}

impl<E: fmt::Display + fmt::Debug> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Fatal { attempt, .. } => *attempt,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal { error, .. } => error,
        }
    }
}

/// Runs `operation` until it succeeds, hits a non-retryable error, or the
/// attempt budget is spent. The closure receives the 1-based attempt number.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: LinearBackoff,
    operation_name: &str,
    mut operation: F,
    is_retryable: R,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: fmt::Display + fmt::Debug,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => {
                return Err(RetryError::Fatal { attempt, error: e });
            }
            Err(e) if attempt >= policy.max_attempts => {
                debug!("{} failed after {} attempts", operation_name, attempt);
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                debug!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name, attempt, policy.max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Doubling reconnect delay with an upper cap.
///
/// The delay is never reset by this type; callers decide if and when a
/// connection counts as healthy.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    current: Duration,
    max: Duration,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Returns the delay to wait now and advances to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn peek(&self) -> Duration {
        self.current
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}
